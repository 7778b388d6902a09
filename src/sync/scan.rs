//! Local directory scanning

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{BucketSyncError, Result};

/// A regular file found in the sync directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCandidate {
    pub path: PathBuf,
    pub file_name: OsString,
}

impl LocalCandidate {
    /// Object key for this file: its base name, if it is valid UTF-8
    pub fn key(&self) -> Option<&str> {
        self.file_name.to_str()
    }

    pub fn display_name(&self) -> String {
        self.file_name.to_string_lossy().into_owned()
    }
}

/// List the regular files directly inside `dir`, sorted by file name.
///
/// Symlinks are followed. Subdirectories, special files and entries whose
/// metadata cannot be read are left out without a report. Only failing to
/// open or iterate the directory itself is an error.
pub async fn scan_directory(dir: &Path) -> Result<Vec<LocalCandidate>> {
    let local_dir_error = |source| BucketSyncError::LocalDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(local_dir_error)?;
    let mut candidates = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(local_dir_error)? {
        let path = entry.path();
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => candidates.push(LocalCandidate {
                path,
                file_name: entry.file_name(),
            }),
            Ok(_) => tracing::trace!("Ignoring non-file entry {}", path.display()),
            Err(e) => tracing::trace!("Ignoring unreadable entry {}: {}", path.display(), e),
        }
    }

    candidates.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(candidates)
}
