use crate::error::AppError;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::{error::DisplayErrorContext, presigning::PresigningConfig, Client};
use std::time::Duration;

/// The object store holding the original images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, AppError>;

    /// Mints a time-limited GET URL for one object.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, AppError>;
}

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, AppError> {
        log::debug!("Fetching s3://{}/{}", bucket, key);
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::ObjectStore(format!(
                    "GetObject s3://{}/{} failed: {}",
                    bucket,
                    key,
                    DisplayErrorContext(e)
                ))
            })?;

        let data = output.body.collect().await.map_err(|e| {
            AppError::Transport(format!("reading s3://{}/{} failed: {}", bucket, key, e))
        })?;
        let bytes = data.into_bytes().to_vec();
        log::trace!("Fetched {} bytes from s3://{}/{}", bytes.len(), bucket, key);
        Ok(bytes)
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, AppError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| AppError::ObjectStore(format!("invalid URL expiry {:?}: {}", expires_in, e)))?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| {
                AppError::ObjectStore(format!(
                    "presigning s3://{}/{} failed: {}",
                    bucket,
                    key,
                    DisplayErrorContext(e)
                ))
            })?;
        Ok(request.uri().to_string())
    }
}
