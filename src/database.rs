use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tracing::{debug, info, warn};

use crate::config::Credentials;
use crate::error::Error;

/// Which tables a dump covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSelection {
    All,
    Only(Vec<String>),
}

/// The database side of a sweep. `MysqlClient` talks to a real server through the
/// mysql command-line tools; tests substitute an in-memory implementation.
pub trait SiteDatabase {
    /// Every table name in the database ("show tables").
    fn list_tables(&self) -> Result<Vec<String>, Error>;

    /// Blog ids of a multisite network, ascending.
    fn list_site_ids(&self, base_prefix: &str) -> Result<Vec<u64>, Error>;

    /// Textual dump of the selected tables.
    fn dump(&self, tables: &TableSelection) -> Result<String, Error>;
}

pub struct MysqlClient {
    mysqldump_path: String,
    mysql_path: String,
    credentials: Credentials,
}

impl MysqlClient {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            mysqldump_path: "mysqldump".to_string(),
            mysql_path: "mysql".to_string(),
            credentials,
        }
    }

    pub fn with_tools(mut self, mysqldump_path: &str, mysql_path: &str) -> Self {
        self.mysqldump_path = mysqldump_path.to_string();
        self.mysql_path = mysql_path.to_string();
        self
    }

    fn query(&self, sql: &str) -> Result<Vec<String>, Error> {
        let mut args = connection_args(&self.credentials);
        args.push("--batch".into());
        args.push("--skip-column-names".into());
        args.push(format!("--execute={}", sql).into());
        args.push(self.credentials.name.clone().into());

        let output = self.run(&self.mysql_path, &args)?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn run(&self, program: &str, args: &[OsString]) -> Result<Output, Error> {
        debug!("Running {} with {} arguments", program, args.len());
        let output = Command::new(program)
            .args(args)
            .env("MYSQL_PWD", &self.credentials.password)
            .output()
            .map_err(|source| Error::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(Error::CommandFailed {
                program: program.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl SiteDatabase for MysqlClient {
    fn list_tables(&self) -> Result<Vec<String>, Error> {
        self.query("SHOW TABLES")
    }

    fn list_site_ids(&self, base_prefix: &str) -> Result<Vec<u64>, Error> {
        let rows = self.query(&format!(
            "SELECT blog_id FROM `{}blogs` ORDER BY blog_id",
            base_prefix.replace('`', "")
        ))?;
        rows.iter()
            .map(|row| {
                row.parse::<u64>()
                    .map_err(|e| Error::Other(format!("Unexpected blog_id '{}': {}", row, e)))
            })
            .collect()
    }

    fn dump(&self, tables: &TableSelection) -> Result<String, Error> {
        // mysqldump with no table arguments dumps everything.
        if matches!(tables, TableSelection::Only(list) if list.is_empty()) {
            warn!("No tables selected, dump is empty");
            return Ok(String::new());
        }

        let destination = tempfile::Builder::new()
            .prefix("wp-clean-uploads-")
            .suffix(".sql")
            .tempfile()?;

        let args = dump_args(&self.credentials, destination.path(), tables);
        self.run(&self.mysqldump_path, &args)?;

        let bytes = fs::read(destination.path())?;
        let dump = String::from_utf8_lossy(&bytes).into_owned();
        info!("Database dump is {} bytes", bytes.len());

        if let Err(e) = destination.close() {
            warn!("Could not remove temporary dump file: {}", e);
        }

        Ok(dump)
    }
}

/// `--user`/`--host` plus `--port` or `--socket` split out of a WordPress style
/// `DB_HOST` (`host`, `host:3307`, `localhost:/run/mysqld/mysqld.sock`).
fn connection_args(credentials: &Credentials) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![format!("--user={}", credentials.user).into()];

    match credentials.host.rsplit_once(':') {
        Some((host, socket)) if socket.starts_with('/') => {
            args.push(format!("--host={}", host).into());
            args.push(format!("--socket={}", socket).into());
        }
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            args.push(format!("--host={}", host).into());
            args.push(format!("--port={}", port).into());
        }
        _ => args.push(format!("--host={}", credentials.host).into()),
    }

    args
}

fn dump_args(credentials: &Credentials, destination: &Path, tables: &TableSelection) -> Vec<OsString> {
    let mut args = connection_args(credentials);

    let mut result_file = OsString::from("--result-file=");
    result_file.push(destination.as_os_str());
    args.push(result_file);

    args.push(credentials.name.clone().into());
    if let TableSelection::Only(list) = tables {
        args.extend(list.iter().map(OsString::from));
    }

    args
}
