//! Object store trait for abstracting storage services
//!
//! This module defines the `ObjectStore` trait that every storage client
//! implements. The synchronizer and the bucket/object helpers only talk to
//! this trait, so the S3 client and the in-memory store are interchangeable.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Result type at the storage boundary
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Metadata returned by an object existence check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object size in bytes
    pub size: u64,
    /// Entity tag, when the service reports one
    pub etag: Option<String>,
}

/// The storage client seam
///
/// # Design Principles
///
/// 1. **Tagged errors**: every method reports failures as a `StoreError`
///    (`NotFound`, `AccessDenied`, `Transient`) so callers pattern-match on
///    the outcome instead of inspecting service error codes.
///
/// 2. **One call per method**: no method retries, batches or caches.
///    Pagination is the only place a method issues several requests.
///
/// 3. **Immutable Self**: methods take `&self`; implementations use
///    interior mutability where they need it.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    // ========================================================================
    // Bucket Operations
    // ========================================================================

    /// Check whether a bucket exists and is reachable
    async fn head_bucket(&self, bucket: &str) -> StoreResult<()>;

    /// Create a bucket, constrained to `region` when one is given
    async fn create_bucket(&self, bucket: &str, region: Option<&str>) -> StoreResult<()>;

    /// Replace the bucket policy with the given JSON document
    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> StoreResult<()>;

    // ========================================================================
    // Object Operations
    // ========================================================================

    /// List every key in the bucket, following pagination to the end
    async fn list_keys(&self, bucket: &str) -> StoreResult<Vec<String>>;

    /// Check whether an object exists
    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectInfo>;

    /// Upload the full content of a local file under `key`
    ///
    /// # Returns
    /// The number of bytes uploaded
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> StoreResult<u64>;

    /// Fetch the full content of an object
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>>;

    /// Delete a single object
    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()>;
}
