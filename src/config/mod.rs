pub mod app_config;
pub mod database;

pub use app_config::{AppConfig, ConfigError, DatabaseConfig, MonitorSettings, SlackConfig};
pub use database::establish_connection;
