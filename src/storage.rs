use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;

use crate::error::RelayError;

/// Bucket prefix holding staged inference inputs.
pub const INPUT_PREFIX: &str = "inputs/";
/// Bucket prefix holding packaged output archives.
pub const OUTPUT_PREFIX: &str = "outputs/";

/// Replace every whitespace character so the name is usable inside a
/// presigned URL.
pub fn sanitize_file_name(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Derive the bucket key an upload is staged under. Uniqueness rests
/// entirely on the wall-clock timestamp: two same-named uploads within the
/// same second collide.
pub fn input_object_key(file_name: &str, timestamp: i64) -> String {
    let name = sanitize_file_name(file_name);
    let stem = name.split('.').next().unwrap_or("");
    format!("{}{}_{}/{}", INPUT_PREFIX, stem, timestamp, name)
}

/// Name of the packaged output archive for a given timestamp.
pub fn output_archive_name(timestamp: i64) -> String {
    format!("outputs_{}.zip", timestamp)
}

/// Bucket key a packaged archive is pushed under.
pub fn output_object_key(archive_name: &str) -> String {
    format!("{}{}", OUTPUT_PREFIX, archive_name)
}

/// Object-storage operations the relay needs. Kept narrow so the HTTP
/// contract is testable without live credentials.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Time-limited write-capable URL for the given key.
    async fn presigned_put_url(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String, RelayError>;

    /// Time-limited read-capable URL for the given key. The object is not
    /// checked to exist.
    async fn presigned_get_url(&self, key: &str, expires_in: Duration)
        -> Result<String, RelayError>;

    /// One listing page of keys under the prefix. Results beyond the
    /// storage API's page size are dropped.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, RelayError>;

    async fn delete_key(&self, key: &str) -> Result<(), RelayError>;
}

/// Production store backed by an S3 bucket.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    fn presigning(expires_in: Duration) -> Result<PresigningConfig, RelayError> {
        PresigningConfig::expires_in(expires_in)
            .map_err(|e| RelayError::Storage(e.to_string()))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn presigned_put_url(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String, RelayError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(Self::presigning(expires_in)?)
            .await
            .map_err(|e| RelayError::Storage(DisplayErrorContext(e).to_string()))?;

        Ok(request.uri().to_string())
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, RelayError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presigning(expires_in)?)
            .await
            .map_err(|e| RelayError::Storage(DisplayErrorContext(e).to_string()))?;

        Ok(request.uri().to_string())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, RelayError> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|e| RelayError::Storage(DisplayErrorContext(e).to_string()))?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();

        Ok(keys)
    }

    async fn delete_key(&self, key: &str) -> Result<(), RelayError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| RelayError::Storage(DisplayErrorContext(e).to_string()))?;

        Ok(())
    }
}
