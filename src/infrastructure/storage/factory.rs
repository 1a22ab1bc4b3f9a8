//! Storage factory for startup-time engine selection

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::domain::storage::StorageEngine;
use crate::domain::DomainError;

use super::file::FileStorage;
use super::postgres::{PostgresConfig, PostgresStorage};

/// Supported storage types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// Single JSON file
    File,
    /// PostgreSQL database
    Database,
}

impl StorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "file" | "json" | "fs" => Some(Self::File),
            "db" | "database" | "postgres" | "postgresql" | "pg" => Some(Self::Database),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// File storage configuration
    File { path: PathBuf },
    /// PostgreSQL storage configuration
    Database(PostgresConfig),
}

impl StorageConfig {
    /// Creates a file storage configuration
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    /// Creates a PostgreSQL storage configuration
    pub fn database(config: PostgresConfig) -> Self {
        Self::Database(config)
    }

    /// Returns the storage type
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::File { .. } => StorageType::File,
            Self::Database(_) => StorageType::Database,
        }
    }
}

/// Factory for creating storage engines
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Builds the engine selected by `config` and reloads it, so the returned
    /// handle is ready for use
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn StorageEngine>, DomainError> {
        let engine: Arc<dyn StorageEngine> = match config {
            StorageConfig::File { path } => Arc::new(FileStorage::from_path(path.clone())),
            StorageConfig::Database(pg_config) => {
                Arc::new(PostgresStorage::connect(pg_config).await?)
            }
        };

        engine.reload().await?;
        info!(storage = ?config.storage_type(), "Storage engine ready");

        Ok(engine)
    }
}
