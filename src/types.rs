//! Core types for bucketsync

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of syncing one local file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Key was already in the bucket; nothing was sent
    Skipped { key: String },
    /// File uploaded under `key`
    Uploaded { key: String, bytes: u64 },
    /// Upload attempted and failed
    Failed { key: String, error: String },
}

impl SyncOutcome {
    pub fn key(&self) -> &str {
        match self {
            SyncOutcome::Skipped { key }
            | SyncOutcome::Uploaded { key, .. }
            | SyncOutcome::Failed { key, .. } => key,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Skipped { key } => write!(f, "File already exists: {}", key),
            SyncOutcome::Uploaded { key, .. } => write!(f, "Uploaded: {}", key),
            SyncOutcome::Failed { key, error } => write!(f, "Failed to upload {}: {}", key, error),
        }
    }
}

/// Totals for one sync pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub bucket: String,
    pub skipped: usize,
    pub uploaded: usize,
    pub failed: usize,
    pub bytes_uploaded: u64,
    /// The bucket listing failed and the pass assumed an empty bucket
    pub listing_failed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl SyncSummary {
    /// Tally a finished pass
    pub fn from_outcomes(
        bucket: &str,
        outcomes: &[SyncOutcome],
        listing_failed: bool,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut summary = Self {
            bucket: bucket.to_string(),
            skipped: 0,
            uploaded: 0,
            failed: 0,
            bytes_uploaded: 0,
            listing_failed,
            started_at,
            completed_at: Utc::now(),
        };
        for outcome in outcomes {
            match outcome {
                SyncOutcome::Skipped { .. } => summary.skipped += 1,
                SyncOutcome::Uploaded { bytes, .. } => {
                    summary.uploaded += 1;
                    summary.bytes_uploaded += bytes;
                }
                SyncOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.skipped + self.uploaded + self.failed
    }
}

/// Success flag plus a human-readable message, returned by single-object helpers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpReport {
    pub success: bool,
    pub message: String,
}

impl OpReport {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Listing result from `list_files`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListing {
    pub files: Vec<String>,
    pub message: String,
}

/// What `ensure_bucket` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsureOutcome {
    AlreadyExists,
    Created,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_status_lines() {
        let skipped = SyncOutcome::Skipped {
            key: "a.txt".into(),
        };
        let uploaded = SyncOutcome::Uploaded {
            key: "b.txt".into(),
            bytes: 3,
        };
        let failed = SyncOutcome::Failed {
            key: "c.txt".into(),
            error: "Access denied: 403".into(),
        };

        assert_eq!(skipped.to_string(), "File already exists: a.txt");
        assert_eq!(uploaded.to_string(), "Uploaded: b.txt");
        assert_eq!(
            failed.to_string(),
            "Failed to upload c.txt: Access denied: 403"
        );
        assert!(failed.is_failed());
        assert_eq!(failed.key(), "c.txt");
    }

    #[test]
    fn test_outcome_json_shape() {
        let json = serde_json::to_value(SyncOutcome::Uploaded {
            key: "b.txt".into(),
            bytes: 3,
        })
        .unwrap();
        assert_eq!(json["status"], "uploaded");
        assert_eq!(json["key"], "b.txt");
        assert_eq!(json["bytes"], 3);
    }

    #[test]
    fn test_summary_tally() {
        let outcomes = vec![
            SyncOutcome::Skipped { key: "a".into() },
            SyncOutcome::Uploaded {
                key: "b".into(),
                bytes: 10,
            },
            SyncOutcome::Uploaded {
                key: "c".into(),
                bytes: 5,
            },
            SyncOutcome::Failed {
                key: "d".into(),
                error: "boom".into(),
            },
        ];
        let summary = SyncSummary::from_outcomes("backup", &outcomes, true, Utc::now());

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.bytes_uploaded, 15);
        assert_eq!(summary.total(), 4);
        assert!(summary.listing_failed);
        assert!(summary.completed_at >= summary.started_at);
    }
}
