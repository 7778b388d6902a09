//! bucketsync - object storage automation
//!
//! Bucket provisioning, skip-existing directory upload and single-object
//! helpers for S3-compatible storage.

pub mod bucket;
pub mod config;
pub mod error;
pub mod objects;
pub mod storage;
pub mod sync;
pub mod types;

pub use config::Settings;
pub use error::{BucketSyncError, Result, StoreError};
pub use storage::{MemoryStore, ObjectStore};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
