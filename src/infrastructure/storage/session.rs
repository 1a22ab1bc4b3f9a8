//! Unit of work for the database engine

use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::entity::{EntityClass, Record};

/// A change waiting for the next commit
#[derive(Debug, Clone, PartialEq)]
pub enum PendingChange {
    Upsert(Record),
    Delete { class: EntityClass, id: String },
}

impl PendingChange {
    pub fn class(&self) -> EntityClass {
        match self {
            Self::Upsert(record) => record.class(),
            Self::Delete { class, .. } => *class,
        }
    }
}

/// Pending upserts and deletes, one entry per storage key.
///
/// A later change to the same key replaces the earlier one, so staging an
/// entity and deleting it before commit leaves a single delete.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    changes: HashMap<String, PendingChange>,
    order: Vec<String>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_upsert(&mut self, record: Record) {
        self.stage(record.storage_key(), PendingChange::Upsert(record));
    }

    pub fn stage_delete(&mut self, record: &Record) {
        self.stage(
            record.storage_key(),
            PendingChange::Delete {
                class: record.class(),
                id: record.id().to_string(),
            },
        );
    }

    fn stage(&mut self, key: String, change: PendingChange) {
        if self.changes.insert(key.clone(), change).is_none() {
            self.order.push(key);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Changes in the order their keys were first staged
    pub fn changes(&self) -> impl Iterator<Item = &PendingChange> {
        self.order.iter().filter_map(|key| self.changes.get(key))
    }

    pub fn clear(&mut self) {
        self.changes.clear();
        self.order.clear();
    }
}

/// The single scope exposed by the database engine.
///
/// Owns the pending unit of work only. Connections are borrowed from the pool
/// for the span of one operation, so every operation passes the pool's
/// liveness check and a connection the server dropped never outlives the call
/// that hit it.
#[derive(Debug)]
pub struct ScopedSession {
    id: Uuid,
    unit: UnitOfWork,
}

impl ScopedSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            unit: UnitOfWork::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn unit(&self) -> &UnitOfWork {
        &self.unit
    }

    pub fn unit_mut(&mut self) -> &mut UnitOfWork {
        &mut self.unit
    }

    /// Discards pending changes
    pub fn release(&mut self) {
        self.unit.clear();
    }
}

impl Default for ScopedSession {
    fn default() -> Self {
        Self::new()
    }
}
