//! Bucket provisioning
//!
//! `ensure_bucket` creates a bucket only when the existence check says it is
//! missing. Unlike the sync listing, any other check failure is returned to
//! the caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::storage::ObjectStore;
use crate::types::EnsureOutcome;

/// How long to wait for a new bucket to become visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            delay: Duration::from_secs(5),
        }
    }
}

/// Check for `bucket` and create it in `region` if it does not exist
pub async fn ensure_bucket<S>(
    store: &S,
    bucket: &str,
    region: Option<&str>,
) -> Result<EnsureOutcome>
where
    S: ObjectStore + ?Sized,
{
    match store.head_bucket(bucket).await {
        Ok(()) => {
            tracing::info!("Bucket '{}' already exists", bucket);
            Ok(EnsureOutcome::AlreadyExists)
        }
        Err(StoreError::NotFound(_)) => {
            store.create_bucket(bucket, region).await?;
            tracing::info!("Bucket '{}' created", bucket);
            Ok(EnsureOutcome::Created)
        }
        Err(e) => Err(e.into()),
    }
}

/// Poll `head_bucket` until `bucket` is visible.
///
/// Only `NotFound` is retried; any other error is returned at once.
pub async fn wait_for_bucket<S>(store: &S, bucket: &str, policy: WaitPolicy) -> Result<()>
where
    S: ObjectStore + ?Sized,
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match store.head_bucket(bucket).await {
            Ok(()) => return Ok(()),
            Err(StoreError::NotFound(detail)) if attempt == attempts => {
                return Err(StoreError::NotFound(format!(
                    "bucket '{}' not available after {} attempts: {}",
                    bucket, attempts, detail
                ))
                .into());
            }
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(
                    "Bucket '{}' not visible yet (attempt {}/{})",
                    bucket,
                    attempt,
                    attempts
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// IAM-style policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketPolicy {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub sid: String,
    pub effect: String,
    pub principal: String,
    pub action: Vec<String>,
    pub resource: String,
}

/// Policy granting anyone read, write and delete on every object in `bucket`.
///
/// This makes the bucket world-writable. Only apply it to buckets meant to
/// be public scratch space.
pub fn public_access_policy(bucket: &str) -> BucketPolicy {
    BucketPolicy {
        version: "2012-10-17".to_string(),
        statement: vec![PolicyStatement {
            sid: "PublicReadWriteDelete".to_string(),
            effect: "Allow".to_string(),
            principal: "*".to_string(),
            action: vec![
                "s3:GetObject".to_string(),
                "s3:PutObject".to_string(),
                "s3:DeleteObject".to_string(),
            ],
            resource: format!("arn:aws:s3:::{}/*", bucket),
        }],
    }
}

/// Attach the public read/write/delete policy to `bucket`
pub async fn apply_public_policy<S>(store: &S, bucket: &str) -> Result<()>
where
    S: ObjectStore + ?Sized,
{
    let policy = serde_json::to_string(&public_access_policy(bucket))?;
    tracing::warn!(
        "Applying public read/write/delete policy to '{}'; anonymous users can modify it",
        bucket
    );
    store.put_bucket_policy(bucket, &policy).await?;
    Ok(())
}

/// Ensure the bucket exists, wait for a new one to appear, then optionally
/// make it public
pub async fn provision_bucket<S>(
    store: &S,
    bucket: &str,
    region: Option<&str>,
    public: bool,
    wait: WaitPolicy,
) -> Result<EnsureOutcome>
where
    S: ObjectStore + ?Sized,
{
    let outcome = ensure_bucket(store, bucket, region).await?;
    if outcome == EnsureOutcome::Created {
        tracing::info!("Waiting for bucket '{}' to be available...", bucket);
        wait_for_bucket(store, bucket, wait).await?;
    }
    if public {
        apply_public_policy(store, bucket).await?;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BucketSyncError;
    use crate::storage::MemoryStore;

    fn quick() -> WaitPolicy {
        WaitPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_ensure_existing_bucket_is_untouched() {
        let store = MemoryStore::new().with_bucket("docs");
        let outcome = ensure_bucket(&store, "docs", Some("eu-west-1")).await.unwrap();

        assert_eq!(outcome, EnsureOutcome::AlreadyExists);
        assert!(store.create_calls().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_propagates_transient_head_error() {
        let store = MemoryStore::new();
        store.fail_head_bucket("docs", StoreError::Transient("timeout".into()));

        let err = ensure_bucket(&store, "docs", None).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(store.create_calls().is_empty());
    }

    #[tokio::test]
    async fn test_wait_retries_until_visible() {
        let store = MemoryStore::new().with_bucket("docs");
        store.delay_visibility("docs", 2);

        wait_for_bucket(&store, "docs", quick()).await.unwrap();
        assert_eq!(store.head_bucket_calls(), 3);
    }

    #[tokio::test]
    async fn test_wait_gives_up() {
        let store = MemoryStore::new();
        let err = wait_for_bucket(&store, "docs", quick()).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(store.head_bucket_calls(), 3);
    }

    #[tokio::test]
    async fn test_wait_stops_on_access_denied() {
        let store = MemoryStore::new();
        store.fail_head_bucket("docs", StoreError::AccessDenied("403".into()));

        let err = wait_for_bucket(&store, "docs", quick()).await.unwrap_err();
        assert!(matches!(
            err,
            BucketSyncError::Store(StoreError::AccessDenied(_))
        ));
        assert_eq!(store.head_bucket_calls(), 1);
    }

    #[tokio::test]
    async fn test_provision_public_bucket() {
        let store = MemoryStore::new();
        let outcome = provision_bucket(&store, "public-docs", Some("eu-west-1"), true, quick())
            .await
            .unwrap();

        assert_eq!(outcome, EnsureOutcome::Created);
        let policy: BucketPolicy =
            serde_json::from_str(&store.policy("public-docs").unwrap()).unwrap();
        assert_eq!(policy, public_access_policy("public-docs"));
    }

    #[tokio::test]
    async fn test_provision_private_bucket_has_no_policy() {
        let store = MemoryStore::new();
        provision_bucket(&store, "private-docs", None, false, quick())
            .await
            .unwrap();

        assert!(store.has_bucket("private-docs"));
        assert!(store.policy("private-docs").is_none());
    }
}
