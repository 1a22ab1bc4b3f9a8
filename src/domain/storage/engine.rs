//! Storage engine contract shared by every backend

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::entity::{EntityClass, Record};
use crate::domain::DomainError;

/// Entities keyed by `"<ClassName>.<id>"`
pub type RecordMap = HashMap<String, Record>;

/// Uniform CRUD contract over the registered entity classes.
///
/// Callers must invoke [`StorageEngine::reload`] once after construction and
/// before anything else; the factory does this for them.
#[async_trait]
pub trait StorageEngine: Send + Sync + Debug {
    /// Every stored entity of `class`, or of every registered class
    async fn all(&self, class: Option<EntityClass>) -> Result<RecordMap, DomainError>;

    /// Registers an entity with the current unit of work
    async fn new(&self, record: Record) -> Result<(), DomainError>;

    /// Persists everything pending since the last save or reload, all or nothing
    async fn save(&self) -> Result<(), DomainError>;

    /// Marks an entity for removal. `None` is a no-op.
    async fn delete(&self, record: Option<&Record>) -> Result<(), DomainError>;

    /// (Re)initializes the backing store and starts a fresh unit of work
    async fn reload(&self) -> Result<(), DomainError>;

    /// Releases the current unit of work without touching committed data
    async fn close(&self) -> Result<(), DomainError>;

    /// Same as [`StorageEngine::all`] with the class given by name
    async fn all_named(&self, name: &str) -> Result<RecordMap, DomainError> {
        let class = EntityClass::from_name(name)?;
        self.all(Some(class)).await
    }

    /// Looks up a single entity
    async fn get(&self, class: EntityClass, id: &str) -> Result<Option<Record>, DomainError> {
        let key = class.storage_key(id);
        Ok(self.all(Some(class)).await?.remove(&key))
    }

    /// Number of stored entities of `class`, or of every class
    async fn count(&self, class: Option<EntityClass>) -> Result<usize, DomainError> {
        Ok(self.all(class).await?.len())
    }
}
