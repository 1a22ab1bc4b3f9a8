use std::env;
use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::DomainError;
use crate::infrastructure::storage::{PostgresConfig, StorageConfig, StorageType};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `file` or `db`
    pub backend: String,
    pub file_path: PathBuf,
    /// `test` drops and recreates the database schema on every reload
    pub environment: String,
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: "file".to_string(),
            file_path: PathBuf::from("file.json"),
            environment: "dev".to_string(),
            database: DatabaseSettings::default(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let defaults = PostgresConfig::default();

        Self {
            host: defaults.host,
            port: defaults.port,
            user: defaults.user,
            password: defaults.password,
            name: defaults.database,
            max_connections: defaults.max_connections,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Flat `HBNB_*` variables from older deployments and the keys they override
const LEGACY_VARIABLES: [(&str, &str); 6] = [
    ("HBNB_TYPE_STORAGE", "storage.backend"),
    ("HBNB_MYSQL_USER", "storage.database.user"),
    ("HBNB_MYSQL_PWD", "storage.database.password"),
    ("HBNB_MYSQL_HOST", "storage.database.host"),
    ("HBNB_MYSQL_DB", "storage.database.name"),
    ("HBNB_ENV", "storage.environment"),
];

/// Resolves legacy variables into config overrides
fn legacy_overrides(lookup: impl Fn(&str) -> Option<String>) -> Vec<(&'static str, String)> {
    LEGACY_VARIABLES
        .iter()
        .filter_map(|(variable, key)| {
            let value = lookup(variable)?;

            // Anything but "db" meant the file engine
            let value = if *variable == "HBNB_TYPE_STORAGE" && value != "db" {
                "file".to_string()
            } else {
                value
            };

            Some((*key, value))
        })
        .collect()
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("HBNB")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        for (key, value) in legacy_overrides(|name| env::var(name).ok()) {
            builder = builder.set_override(key, value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Translates the settings into the engine selection the factory takes
    pub fn storage_config(&self) -> Result<StorageConfig, DomainError> {
        let settings = &self.storage;

        match StorageType::from_str(&settings.backend) {
            Some(StorageType::File) => Ok(StorageConfig::file(settings.file_path.clone())),
            Some(StorageType::Database) => {
                let db = &settings.database;
                let config = PostgresConfig::new(&db.host, &db.user, &db.password, &db.name)
                    .with_port(db.port)
                    .with_max_connections(db.max_connections)
                    .with_drop_on_reload(settings.is_test());

                Ok(StorageConfig::database(config))
            }
            None => Err(DomainError::configuration(format!(
                "Unknown storage backend '{}'",
                settings.backend
            ))),
        }
    }
}

impl StorageSettings {
    pub fn is_test(&self) -> bool {
        self.environment.eq_ignore_ascii_case("test")
    }
}
