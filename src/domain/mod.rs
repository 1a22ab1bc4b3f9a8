//! Domain layer - entities, the class registry and the storage contract

pub mod entity;
pub mod error;
pub mod storage;

pub use entity::{
    Amenity, BaseModel, City, Entity, EntityClass, ForeignKey, Place, Record, Review, State, User,
};
pub use error::DomainError;
pub use storage::{RecordMap, StorageEngine};
