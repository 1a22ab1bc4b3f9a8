//! Attributes shared by every persisted entity

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::class::EntityClass;

/// Identity and timestamps common to all entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseModel {
    id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Default for BaseModel {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseModel {
    /// Fresh identity with a random id and both timestamps set to now
    pub fn new() -> Self {
        let timestamp = now();

        Self {
            id: Uuid::new_v4().to_string(),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Rebuilds a base from already persisted values
    pub fn from_parts(
        id: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Marks the entity as modified
    pub fn touch(&mut self) {
        self.updated_at = now();
    }
}

// Microsecond precision survives a round trip through TIMESTAMPTZ
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Contract every persisted entity fulfils
pub trait Entity {
    /// Registry entry for this entity type
    const CLASS: EntityClass;

    fn base(&self) -> &BaseModel;

    fn base_mut(&mut self) -> &mut BaseModel;

    fn id(&self) -> &str {
        self.base().id()
    }

    fn storage_key(&self) -> String {
        Self::CLASS.storage_key(self.id())
    }
}
