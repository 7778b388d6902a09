//! S3-compatible object store (AWS S3, R2, MinIO)

use std::path::Path;

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client as S3Client;

use super::backend::{ObjectInfo, ObjectStore, StoreResult};
use crate::config::{Settings, FALLBACK_REGION};
use crate::error::StoreError;

/// Object store backed by the AWS SDK
#[derive(Debug, Clone)]
pub struct S3Store {
    client: S3Client,
    region: String,
}

impl S3Store {
    /// Build a client from explicit settings.
    ///
    /// Credentials come from the SDK's default chain. The region is taken
    /// from the settings, then the environment/profile, then `us-east-1`.
    pub async fn connect(settings: &Settings) -> Self {
        let region_provider =
            RegionProviderChain::first_try(settings.region.clone().map(Region::new))
                .or_default_provider()
                .or_else(Region::new(FALLBACK_REGION));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(timeout) = settings.timeout() {
            loader =
                loader.timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
        }
        let sdk_config = loader.load().await;

        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| FALLBACK_REGION.to_string());

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.force_path_style)
            .build();

        tracing::debug!("S3 client ready (region {})", region);
        Self {
            client: S3Client::from_conf(s3_config),
            region,
        }
    }

    /// Region the client resolved to
    pub fn region(&self) -> &str {
        &self.region
    }
}

/// Map an SDK failure onto the tagged store error.
///
/// HEAD requests carry no error body, so the HTTP status is checked before
/// the service error code.
fn classify<E>(err: SdkError<E, HttpResponse>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().map(str::to_string);
    let detail = DisplayErrorContext(&err).to_string();

    classify_parts(status, code.as_deref(), detail)
}

fn classify_parts(status: Option<u16>, code: Option<&str>, detail: String) -> StoreError {
    match (status, code) {
        (_, Some("NoSuchBucket" | "NoSuchKey" | "NotFound")) | (Some(404), _) => {
            StoreError::NotFound(detail)
        }
        (_, Some("AccessDenied" | "Forbidden" | "AllAccessDisabled")) | (Some(403), _) => {
            StoreError::AccessDenied(detail)
        }
        _ => StoreError::Transient(detail),
    }
}

/// Location constraint for `region`; `us-east-1` must not send one
fn location_constraint(region: &str) -> Option<CreateBucketConfiguration> {
    if region == FALLBACK_REGION {
        return None;
    }
    Some(
        CreateBucketConfiguration::builder()
            .location_constraint(BucketLocationConstraint::from(region))
            .build(),
    )
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn head_bucket(&self, bucket: &str) -> StoreResult<()> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn create_bucket(&self, bucket: &str, region: Option<&str>) -> StoreResult<()> {
        let region = region.unwrap_or(&self.region);
        self.client
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(location_constraint(region))
            .send()
            .await
            .map_err(classify)?;

        tracing::info!("Created bucket s3://{} in {}", bucket, region);
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> StoreResult<()> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn list_keys(&self, bucket: &str) -> StoreResult<Vec<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(classify)?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(String::from)),
            );
        }

        tracing::debug!("Listed {} keys in s3://{}", keys.len(), bucket);
        Ok(keys)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectInfo> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(classify)?;

        Ok(ObjectInfo {
            size: response.content_length().unwrap_or(0).max(0) as u64,
            etag: response.e_tag().map(String::from),
        })
    }

    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> StoreResult<u64> {
        let local_error =
            |e: &dyn std::fmt::Display| StoreError::Transient(format!("{}: {}", path.display(), e));

        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| local_error(&e))?
            .len();
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| local_error(&e))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        tracing::info!("Uploaded {} bytes to s3://{}/{}", size, bucket, key);
        Ok(size)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(classify)?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?
            .into_bytes();

        Ok(data.to_vec())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(classify)?;

        tracing::info!("Deleted s3://{}/{}", bucket, key);
        Ok(())
    }
}
