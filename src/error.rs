use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Missing setting '{0}': set it in the config file or define it in wp-config.php")]
    MissingSetting(&'static str),

    #[error("Invalid ignore pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Invalid table prefix pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Could not run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Database dump is empty, refusing to treat every upload as orphaned")]
    EmptyDump,

    #[error("Uploads directory {} does not exist", .0.display())]
    UploadsMissing(PathBuf),

    #[error("{0}")]
    Other(String),
}
