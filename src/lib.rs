pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod progress;
pub mod prune;
pub mod site;
pub mod sweep;
pub mod walk;
pub mod wp_config;

pub use crate::config::{AppConfig, Settings};
pub use crate::database::{MysqlClient, SiteDatabase, TableSelection};
pub use crate::engine::{CleanEngine, CleanReport, SiteReport};
pub use crate::error::Error;
pub use crate::progress::{SilentReporter, SweepReporter};
