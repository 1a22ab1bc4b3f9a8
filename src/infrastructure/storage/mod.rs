//! Storage infrastructure - Storage engine implementations

mod factory;
mod file;
mod postgres;
mod schema;
mod session;

pub use factory::{StorageConfig, StorageFactory, StorageType};
pub use file::FileStorage;
pub use postgres::{PostgresConfig, PostgresStorage};
pub use session::{PendingChange, ScopedSession, UnitOfWork};
