//! Infrastructure layer - Storage backends and process plumbing

pub mod logging;
pub mod storage;
