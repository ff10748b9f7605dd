use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Error;
use crate::wp_config::WpConfig;

pub const DEFAULT_TABLE_PREFIX: &str = "wp_";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// WordPress install directory. `wp-config.php` is read from here (or its parent)
    /// and supplies anything not set explicitly.
    #[serde(default)]
    pub wordpress_root: Option<PathBuf>,
    #[serde(default)]
    pub uploads_dir: Option<PathBuf>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub table_prefix: Option<String>,
    #[serde(default)]
    pub multisite: MultisiteConfig,
    #[serde(default)]
    pub mysqldump_path: Option<String>,
    #[serde(default)]
    pub mysql_path: Option<String>,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default)]
    pub allow_empty_dump: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MultisiteConfig {
    pub enabled: Option<bool>,
    #[serde(default)]
    pub uploads_layout: UploadsLayout,
}

/// Where a network keeps each site's uploads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadsLayout {
    /// Main site in the uploads root, site N in `sites/N`.
    #[default]
    PerSite,
    /// Every site writes to the uploads root.
    Shared,
}

/// Fully resolved settings the engine runs with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub uploads_dir: PathBuf,
    pub credentials: Credentials,
    pub table_prefix: String,
    pub multisite: bool,
    pub uploads_layout: UploadsLayout,
    pub mysqldump_path: String,
    pub mysql_path: String,
    pub ignore_patterns: Vec<String>,
    pub allow_empty_dump: bool,
}

#[derive(Clone)]
pub struct Credentials {
    pub host: String,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"********")
            .field("name", &self.name)
            .finish()
    }
}

/// Load `<name>.{toml,yaml,json}` if present, then `WPCU_*` environment variables
/// (`WPCU_DATABASE__PASSWORD` sets `database.password`).
pub fn load_configuration(name: &str) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name(name).required(false))
        .add_source(
            Environment::with_prefix("WPCU")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

impl AppConfig {
    pub fn resolve(self) -> Result<Settings, Error> {
        let wp = match self.wordpress_root.as_deref() {
            Some(root) => match find_wp_config(root) {
                Some(path) => {
                    debug!("Reading {}", path.display());
                    WpConfig::load(&path)?
                }
                None => {
                    debug!("No wp-config.php found near {}", root.display());
                    WpConfig::default()
                }
            },
            None => WpConfig::default(),
        };
        self.resolve_with(wp)
    }

    /// Merge explicit settings over values read from `wp-config.php`.
    pub fn resolve_with(self, wp: WpConfig) -> Result<Settings, Error> {
        let uploads_dir = self
            .uploads_dir
            .or_else(|| {
                self.wordpress_root
                    .as_ref()
                    .map(|root| root.join("wp-content").join("uploads"))
            })
            .ok_or(Error::MissingSetting("uploads_dir"))?;

        let credentials = Credentials {
            host: self
                .database
                .host
                .or(wp.db_host)
                .unwrap_or_else(|| "localhost".to_string()),
            user: self
                .database
                .user
                .or(wp.db_user)
                .ok_or(Error::MissingSetting("database.user"))?,
            password: self.database.password.or(wp.db_password).unwrap_or_default(),
            name: self
                .database
                .name
                .or(wp.db_name)
                .ok_or(Error::MissingSetting("database.name"))?,
        };

        Ok(Settings {
            uploads_dir,
            credentials,
            table_prefix: self
                .table_prefix
                .or(wp.table_prefix)
                .unwrap_or_else(|| DEFAULT_TABLE_PREFIX.to_string()),
            multisite: self.multisite.enabled.unwrap_or(wp.multisite),
            uploads_layout: self.multisite.uploads_layout,
            mysqldump_path: self
                .mysqldump_path
                .unwrap_or_else(|| "mysqldump".to_string()),
            mysql_path: self.mysql_path.unwrap_or_else(|| "mysql".to_string()),
            ignore_patterns: self.ignore_patterns,
            allow_empty_dump: self.allow_empty_dump,
        })
    }
}

/// WordPress allows `wp-config.php` one level above the install directory.
fn find_wp_config(root: &Path) -> Option<PathBuf> {
    let direct = root.join("wp-config.php");
    if direct.is_file() {
        return Some(direct);
    }
    let above = root.parent()?.join("wp-config.php");
    above.is_file().then_some(above)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp() -> WpConfig {
        WpConfig {
            db_name: Some("wordpress".to_string()),
            db_user: Some("wp".to_string()),
            db_password: Some("secret".to_string()),
            db_host: Some("db:3306".to_string()),
            table_prefix: Some("site_".to_string()),
            multisite: true,
        }
    }

    #[test]
    fn test_resolve_falls_back_to_wp_config() {
        let config = AppConfig {
            wordpress_root: Some(PathBuf::from("/var/www/html")),
            ..Default::default()
        };
        let settings = config.resolve_with(wp()).unwrap();
        assert_eq!(
            settings.uploads_dir,
            PathBuf::from("/var/www/html/wp-content/uploads")
        );
        assert_eq!(settings.credentials.name, "wordpress");
        assert_eq!(settings.credentials.host, "db:3306");
        assert_eq!(settings.table_prefix, "site_");
        assert!(settings.multisite);
        assert_eq!(settings.uploads_layout, UploadsLayout::PerSite);
        assert_eq!(settings.mysqldump_path, "mysqldump");
        assert!(!settings.allow_empty_dump);
    }

    #[test]
    fn test_explicit_values_win() {
        let config = AppConfig {
            uploads_dir: Some(PathBuf::from("/srv/uploads")),
            database: DatabaseConfig {
                name: Some("other".to_string()),
                ..Default::default()
            },
            multisite: MultisiteConfig {
                enabled: Some(false),
                uploads_layout: UploadsLayout::Shared,
            },
            ..Default::default()
        };
        let settings = config.resolve_with(wp()).unwrap();
        assert_eq!(settings.uploads_dir, PathBuf::from("/srv/uploads"));
        assert_eq!(settings.credentials.name, "other");
        assert_eq!(settings.credentials.user, "wp");
        assert!(!settings.multisite);
    }

    #[test]
    fn test_missing_database_name() {
        let config = AppConfig {
            uploads_dir: Some(PathBuf::from("/srv/uploads")),
            database: DatabaseConfig {
                user: Some("root".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.resolve_with(WpConfig::default()).unwrap_err();
        assert!(matches!(err, Error::MissingSetting("database.name")));
    }

    #[test]
    fn test_debug_hides_password() {
        let settings = AppConfig {
            uploads_dir: Some(PathBuf::from("/srv/uploads")),
            ..Default::default()
        }
        .resolve_with(wp())
        .unwrap();
        let printed = format!("{:?}", settings);
        assert!(!printed.contains("secret"));
    }
}
