//! Single-object helpers
//!
//! Each helper issues its own remote calls and reports the result as an
//! [`OpReport`] (or [`FileListing`]) instead of returning an error. Callers
//! check `success` explicitly.

use std::path::Path;

use crate::error::StoreError;
use crate::storage::ObjectStore;
use crate::types::{FileListing, OpReport};

/// Upload `path` unless an object with the same key already exists.
///
/// The key is `object_name`, or the file's base name when none is given.
pub async fn upload_file_if_absent<S>(
    store: &S,
    bucket: &str,
    path: &Path,
    object_name: Option<&str>,
) -> OpReport
where
    S: ObjectStore + ?Sized,
{
    let key = match object_name.filter(|name| !name.is_empty()) {
        Some(name) => name.to_string(),
        None => match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                return OpReport::failed(format!(
                    "Error uploading file: cannot derive object name from '{}'",
                    path.display()
                ))
            }
        },
    };

    match store.head_object(bucket, &key).await {
        Ok(_) => {
            return OpReport::failed(format!(
                "File '{}' already exists in bucket '{}'. Upload skipped.",
                key, bucket
            ))
        }
        Err(StoreError::NotFound(_)) => {}
        Err(e) => return OpReport::failed(format!("Error checking file existence: {}", e)),
    }

    match store.put_file(bucket, &key, path).await {
        Ok(_) => OpReport::ok(format!("File '{}' uploaded to bucket '{}'.", key, bucket)),
        Err(e) => OpReport::failed(format!("Error uploading file: {}", e)),
    }
}

/// List every key in `bucket`
pub async fn list_files<S>(store: &S, bucket: &str) -> FileListing
where
    S: ObjectStore + ?Sized,
{
    match store.list_keys(bucket).await {
        Ok(files) if files.is_empty() => FileListing {
            files,
            message: format!("Bucket '{}' is empty.", bucket),
        },
        Ok(files) => {
            let message = format!("Files in bucket '{}': {:?}", bucket, files);
            FileListing { files, message }
        }
        Err(e) => FileListing {
            files: Vec::new(),
            message: format!("Error listing files: {}", e),
        },
    }
}

/// Delete one object
pub async fn delete_file<S>(store: &S, bucket: &str, key: &str) -> OpReport
where
    S: ObjectStore + ?Sized,
{
    match store.delete_object(bucket, key).await {
        Ok(()) => OpReport::ok(format!("File '{}' deleted from bucket '{}'.", key, bucket)),
        Err(e) => OpReport::failed(format!("Error deleting file: {}", e)),
    }
}

/// Download one object to `dest`, creating parent directories
pub async fn download_file<S>(store: &S, bucket: &str, key: &str, dest: &Path) -> OpReport
where
    S: ObjectStore + ?Sized,
{
    let data = match store.get_object(bucket, key).await {
        Ok(data) => data,
        Err(e) => return OpReport::failed(format!("Error downloading file: {}", e)),
    };

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            return OpReport::failed(format!("Error downloading file: {}", e));
        }
    }
    if let Err(e) = tokio::fs::write(dest, &data).await {
        return OpReport::failed(format!("Error downloading file: {}", e));
    }

    tracing::info!(
        "Downloaded {} bytes from s3://{}/{}",
        data.len(),
        bucket,
        key
    );
    OpReport::ok(format!(
        "File '{}' downloaded from bucket '{}' to '{}'.",
        key,
        bucket,
        dest.display()
    ))
}
