//! Explicit storage handle shared by the application

use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::domain::storage::StorageEngine;
use crate::domain::DomainError;
use crate::infrastructure::storage::StorageFactory;

/// The one storage engine of a process, passed to whoever needs it.
///
/// Cloning shares the engine. Tests build their own context around a fresh
/// or mock engine instead of touching any global.
#[derive(Clone, Debug)]
pub struct StorageContext {
    storage: Arc<dyn StorageEngine>,
}

impl StorageContext {
    /// Selects, constructs and reloads the engine named by the configuration
    pub async fn bootstrap(config: &AppConfig) -> Result<Self, DomainError> {
        let storage_config = config.storage_config()?;
        info!(backend = %config.storage.backend, "Bootstrapping storage");

        let storage = StorageFactory::create(&storage_config).await?;
        Ok(Self { storage })
    }

    /// Wraps an engine that has not been reloaded yet and reloads it
    pub async fn with_engine(storage: Arc<dyn StorageEngine>) -> Result<Self, DomainError> {
        storage.reload().await?;
        Ok(Self { storage })
    }

    pub fn storage(&self) -> &Arc<dyn StorageEngine> {
        &self.storage
    }
}
