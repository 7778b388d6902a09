//! Skip-existing directory upload
//!
//! A sync pass snapshots the keys already in the bucket, then uploads every
//! regular file of the local directory whose base name is not in that
//! snapshot. Per-file failures are reported as outcomes and never stop the
//! pass.

mod scan;

pub use scan::{scan_directory, LocalCandidate};

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;

use crate::error::Result;
use crate::storage::{ObjectStore, StoreResult};
use crate::types::{SyncOutcome, SyncSummary};

/// Collect every key currently in `bucket`
pub async fn list_existing_keys<S>(store: &S, bucket: &str) -> StoreResult<HashSet<String>>
where
    S: ObjectStore + ?Sized,
{
    Ok(store.list_keys(bucket).await?.into_iter().collect())
}

/// Upload the files of `local_dir` that are not yet in `bucket`.
///
/// Returns one outcome per regular file, in file-name order. Fails only when
/// the local directory cannot be read.
pub async fn synchronize<S>(
    store: &S,
    bucket: &str,
    local_dir: &Path,
) -> Result<Vec<SyncOutcome>>
where
    S: ObjectStore + ?Sized,
{
    synchronize_with_summary(store, bucket, local_dir)
        .await
        .map(|(outcomes, _)| outcomes)
}

/// Same as [`synchronize`], also returning the pass totals
pub async fn synchronize_with_summary<S>(
    store: &S,
    bucket: &str,
    local_dir: &Path,
) -> Result<(Vec<SyncOutcome>, SyncSummary)>
where
    S: ObjectStore + ?Sized,
{
    let started_at = Utc::now();
    let candidates = scan_directory(local_dir).await?;

    // Fail open: a listing error is treated as an empty bucket
    let (existing, listing_failed) = match list_existing_keys(store, bucket).await {
        Ok(keys) => (keys, false),
        Err(e) => {
            tracing::warn!(
                "Could not list s3://{}, assuming it is empty: {}",
                bucket,
                e
            );
            (HashSet::new(), true)
        }
    };

    let mut outcomes = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let outcome = sync_one(store, bucket, candidate, &existing).await;
        if let SyncOutcome::Failed { key, error } = &outcome {
            tracing::error!("Upload of {} to s3://{} failed: {}", key, bucket, error);
        }
        outcomes.push(outcome);
    }

    let summary = SyncSummary::from_outcomes(bucket, &outcomes, listing_failed, started_at);
    tracing::info!(
        "Sync to s3://{} finished: {} uploaded, {} skipped, {} failed in {}ms",
        bucket,
        summary.uploaded,
        summary.skipped,
        summary.failed,
        (summary.completed_at - summary.started_at).num_milliseconds()
    );

    Ok((outcomes, summary))
}

async fn sync_one<S>(
    store: &S,
    bucket: &str,
    candidate: &LocalCandidate,
    existing: &HashSet<String>,
) -> SyncOutcome
where
    S: ObjectStore + ?Sized,
{
    let Some(key) = candidate.key() else {
        return SyncOutcome::Failed {
            key: candidate.display_name(),
            error: "file name is not valid UTF-8".to_string(),
        };
    };

    if existing.contains(key) {
        tracing::debug!("Skipping {}, already in s3://{}", key, bucket);
        return SyncOutcome::Skipped {
            key: key.to_string(),
        };
    }

    match store.put_file(bucket, key, &candidate.path).await {
        Ok(bytes) => SyncOutcome::Uploaded {
            key: key.to_string(),
            bytes,
        },
        Err(e) => SyncOutcome::Failed {
            key: key.to_string(),
            error: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::storage::MemoryStore;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_list_existing_keys() {
        let store = MemoryStore::new().with_bucket("docs");
        store.insert_object("docs", "a.txt", "a");
        store.insert_object("docs", "b.txt", "b");

        let keys = list_existing_keys(&store, "docs").await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("a.txt"));
    }

    #[tokio::test]
    async fn test_summary_flags_fail_open() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "abc").unwrap();

        let store = MemoryStore::new().with_bucket("docs");
        store.insert_object("docs", "a.txt", "old");
        store.fail_listing("docs", StoreError::Transient("throttled".into()));

        let (outcomes, summary) = synchronize_with_summary(&store, "docs", dir.path())
            .await
            .unwrap();

        assert!(summary.listing_failed);
        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.bytes_uploaded, 3);
        // Existing object is overwritten because the snapshot was empty
        assert_eq!(store.object("docs", "a.txt").unwrap(), b"abc".to_vec());
        assert_eq!(
            outcomes,
            vec![SyncOutcome::Uploaded {
                key: "a.txt".into(),
                bytes: 3
            }]
        );
    }

    #[tokio::test]
    async fn test_works_through_trait_object() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("x.bin"), [0u8; 4]).unwrap();

        let store: Box<dyn ObjectStore> = Box::new(MemoryStore::new().with_bucket("docs"));
        let outcomes = synchronize(store.as_ref(), "docs", dir.path()).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], SyncOutcome::Uploaded { bytes: 4, .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_name_fails_without_stopping_pass() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff.txt")), "x").unwrap();
        std::fs::write(dir.path().join("ok.txt"), "a").unwrap();

        let store = MemoryStore::new().with_bucket("docs");
        let outcomes = synchronize(&store, "docs", dir.path()).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        match &outcomes[0] {
            SyncOutcome::Failed { error, .. } => {
                assert_eq!(error, "file name is not valid UTF-8")
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(
            outcomes[1],
            SyncOutcome::Uploaded {
                key: "ok.txt".into(),
                bytes: 1
            }
        );
        assert_eq!(store.put_calls(), vec!["ok.txt".to_string()]);
    }
}
