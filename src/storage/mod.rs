//! Storage clients for bucketsync
//!
//! # Feature Flags
//!
//! The S3 client requires the `cloud` feature. The in-memory store is always
//! available.

mod backend;
pub mod memory;
#[cfg(feature = "cloud")]
mod s3;

pub use backend::{ObjectInfo, ObjectStore, StoreResult};
pub use memory::MemoryStore;
#[cfg(feature = "cloud")]
pub use s3::S3Store;
