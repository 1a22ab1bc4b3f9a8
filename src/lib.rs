//! HBnB storage
//!
//! One storage contract for the HBnB entities with two interchangeable engines:
//! - a JSON file engine for single-process use
//! - a PostgreSQL engine with a scoped unit of work
//!
//! The engine is picked once at startup from configuration and handed to the
//! rest of the application through a [`StorageContext`].

pub mod cli;
pub mod config;
pub mod context;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use context::StorageContext;
pub use domain::{DomainError, EntityClass, Record, StorageEngine};
