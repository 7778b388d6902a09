//! In-memory object store
//!
//! Mirrors the S3 semantics the rest of the crate relies on (missing bucket
//! is `NotFound`, deletes of absent keys succeed) and lets callers inject
//! faults per bucket or per key. Every create and put call is recorded so
//! tests can assert on what was sent.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::backend::{ObjectInfo, ObjectStore, StoreResult};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct MemoryBucket {
    region: Option<String>,
    policy: Option<String>,
    objects: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug, Default)]
struct Faults {
    head_bucket: HashMap<String, StoreError>,
    listing: HashMap<String, StoreError>,
    head_object: HashMap<String, StoreError>,
    put: HashMap<String, StoreError>,
    delete: HashMap<String, StoreError>,
    /// Remaining `head_bucket` calls that report a freshly created bucket as missing
    hidden_heads: HashMap<String, usize>,
}

#[derive(Debug, Default)]
struct Inner {
    buckets: BTreeMap<String, MemoryBucket>,
    faults: Faults,
    create_calls: Vec<(String, Option<String>)>,
    put_calls: Vec<String>,
    head_bucket_calls: usize,
}

/// Object store held entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper that creates an empty bucket
    pub fn with_bucket(self, bucket: &str) -> Self {
        self.inner
            .lock()
            .buckets
            .entry(bucket.to_string())
            .or_default();
        self
    }

    /// Store an object directly, creating the bucket if needed
    pub fn insert_object(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        self.inner
            .lock()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .objects
            .insert(key.to_string(), data.into());
    }

    /// Make every `head_bucket` call for `bucket` fail with `error`
    pub fn fail_head_bucket(&self, bucket: &str, error: StoreError) {
        self.inner
            .lock()
            .faults
            .head_bucket
            .insert(bucket.to_string(), error);
    }

    /// Make listing `bucket` fail with `error`
    pub fn fail_listing(&self, bucket: &str, error: StoreError) {
        self.inner
            .lock()
            .faults
            .listing
            .insert(bucket.to_string(), error);
    }

    /// Make existence checks of `key` fail with `error`, in any bucket
    pub fn fail_head_object(&self, key: &str, error: StoreError) {
        self.inner
            .lock()
            .faults
            .head_object
            .insert(key.to_string(), error);
    }

    /// Make uploads of `key` fail with `error`, in any bucket
    pub fn fail_put(&self, key: &str, error: StoreError) {
        self.inner.lock().faults.put.insert(key.to_string(), error);
    }

    /// Make deletes of `key` fail with `error`, in any bucket
    pub fn fail_delete(&self, key: &str, error: StoreError) {
        self.inner
            .lock()
            .faults
            .delete
            .insert(key.to_string(), error);
    }

    /// Report `bucket` as missing for the next `checks` head calls after it is created
    pub fn delay_visibility(&self, bucket: &str, checks: usize) {
        self.inner
            .lock()
            .faults
            .hidden_heads
            .insert(bucket.to_string(), checks);
    }

    /// Every `create_bucket` call received, with its region
    pub fn create_calls(&self) -> Vec<(String, Option<String>)> {
        self.inner.lock().create_calls.clone()
    }

    /// Every key passed to `put_file`, including failed attempts
    pub fn put_calls(&self) -> Vec<String> {
        self.inner.lock().put_calls.clone()
    }

    pub fn head_bucket_calls(&self) -> usize {
        self.inner.lock().head_bucket_calls
    }

    /// Sorted keys currently held in `bucket`
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.inner
            .lock()
            .buckets
            .get(bucket)
            .map(|b| b.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.inner
            .lock()
            .buckets
            .get(bucket)
            .and_then(|b| b.objects.get(key).cloned())
    }

    pub fn policy(&self, bucket: &str) -> Option<String> {
        self.inner
            .lock()
            .buckets
            .get(bucket)
            .and_then(|b| b.policy.clone())
    }

    pub fn bucket_region(&self, bucket: &str) -> Option<String> {
        self.inner
            .lock()
            .buckets
            .get(bucket)
            .and_then(|b| b.region.clone())
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.inner.lock().buckets.contains_key(bucket)
    }
}

fn no_such_bucket(bucket: &str) -> StoreError {
    StoreError::NotFound(format!("NoSuchBucket: {}", bucket))
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_bucket(&self, bucket: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner.head_bucket_calls += 1;

        if let Some(err) = inner.faults.head_bucket.get(bucket) {
            return Err(err.clone());
        }
        if !inner.buckets.contains_key(bucket) {
            return Err(no_such_bucket(bucket));
        }
        if let Some(remaining) = inner.faults.hidden_heads.get_mut(bucket) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(no_such_bucket(bucket));
            }
        }
        Ok(())
    }

    async fn create_bucket(&self, bucket: &str, region: Option<&str>) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner
            .create_calls
            .push((bucket.to_string(), region.map(String::from)));

        if inner.buckets.contains_key(bucket) {
            return Err(StoreError::Transient(format!(
                "BucketAlreadyOwnedByYou: {}",
                bucket
            )));
        }
        inner.buckets.insert(
            bucket.to_string(),
            MemoryBucket {
                region: region.map(String::from),
                ..Default::default()
            },
        );
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        let entry = inner
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;
        entry.policy = Some(policy.to_string());
        Ok(())
    }

    async fn list_keys(&self, bucket: &str) -> StoreResult<Vec<String>> {
        let inner = self.inner.lock();
        if let Some(err) = inner.faults.listing.get(bucket) {
            return Err(err.clone());
        }
        inner
            .buckets
            .get(bucket)
            .map(|b| b.objects.keys().cloned().collect())
            .ok_or_else(|| no_such_bucket(bucket))
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectInfo> {
        let inner = self.inner.lock();
        if let Some(err) = inner.faults.head_object.get(key) {
            return Err(err.clone());
        }
        let entry = inner
            .buckets
            .get(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;
        entry
            .objects
            .get(key)
            .map(|data| ObjectInfo {
                size: data.len() as u64,
                etag: None,
            })
            .ok_or_else(|| StoreError::NotFound(format!("NoSuchKey: {}", key)))
    }

    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> StoreResult<u64> {
        {
            let mut inner = self.inner.lock();
            inner.put_calls.push(key.to_string());
            if let Some(err) = inner.faults.put.get(key) {
                return Err(err.clone());
            }
            if !inner.buckets.contains_key(bucket) {
                return Err(no_such_bucket(bucket));
            }
        }

        // The lock is not held across the read
        let data = tokio::fs::read(path).await.map_err(|e| {
            StoreError::Transient(format!("failed to read {}: {}", path.display(), e))
        })?;
        let size = data.len() as u64;

        let mut inner = self.inner.lock();
        let entry = inner
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;
        entry.objects.insert(key.to_string(), data);
        Ok(size)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>> {
        let inner = self.inner.lock();
        let entry = inner
            .buckets
            .get(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;
        entry
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("NoSuchKey: {}", key)))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.faults.delete.get(key) {
            return Err(err.clone());
        }
        let entry = inner
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(bucket))?;
        entry.objects.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_bucket_is_not_found() {
        let store = MemoryStore::new();
        assert!(store.head_bucket("nope").await.unwrap_err().is_not_found());
        assert!(store.list_keys("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_create_records_region() {
        let store = MemoryStore::new();
        store.create_bucket("docs", Some("eu-west-1")).await.unwrap();

        assert!(store.head_bucket("docs").await.is_ok());
        assert_eq!(store.bucket_region("docs").as_deref(), Some("eu-west-1"));
        assert_eq!(
            store.create_calls(),
            vec![("docs".to_string(), Some("eu-west-1".to_string()))]
        );
        assert!(store.create_bucket("docs", None).await.is_err());
    }

    #[tokio::test]
    async fn test_head_object_fault() {
        let store = MemoryStore::new().with_bucket("docs");
        store.insert_object("docs", "a.txt", "a");
        store.fail_head_object("a.txt", StoreError::Transient("timeout".into()));

        assert_eq!(
            store.head_object("docs", "a.txt").await.unwrap_err(),
            StoreError::Transient("timeout".into())
        );
        assert!(store.head_object("docs", "b.txt").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_absent_key_succeeds() {
        let store = MemoryStore::new().with_bucket("docs");
        store.insert_object("docs", "a.txt", "a");

        store.delete_object("docs", "missing.txt").await.unwrap();
        store.delete_object("docs", "a.txt").await.unwrap();
        assert!(store.keys("docs").is_empty());
    }

    #[tokio::test]
    async fn test_delayed_visibility() {
        let store = MemoryStore::new().with_bucket("docs");
        store.delay_visibility("docs", 2);

        assert!(store.head_bucket("docs").await.is_err());
        assert!(store.head_bucket("docs").await.is_err());
        assert!(store.head_bucket("docs").await.is_ok());
        assert_eq!(store.head_bucket_calls(), 3);
    }
}
