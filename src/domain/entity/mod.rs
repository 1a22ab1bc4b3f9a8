//! Persisted entities and the closed class registry

mod base;
mod class;
mod models;
mod record;

pub use base::{BaseModel, Entity};
pub use class::{EntityClass, ForeignKey};
pub use models::{Amenity, City, Place, Review, State, User};
pub use record::{CLASS_TAG, Record};
