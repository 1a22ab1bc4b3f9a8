//! Layered configuration: optional files, then `HBNB_*` environment variables

mod app_config;

pub use app_config::{AppConfig, DatabaseSettings, LogFormat, LoggingConfig, StorageSettings};
