//! Storage domain - engine contract independent of any backend

mod engine;

pub use engine::{RecordMap, StorageEngine};

#[cfg(test)]
pub use engine::mock;
