use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::{AnalyzerError, Result};

pub mod transcripts;

#[cfg(test)]
pub(crate) mod memory;

/// Key-addressed object storage as seen by the handler
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Copy an object to a local file, returning the number of bytes written
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64>;

    /// Read a whole object into memory
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Create or replace an object
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;

    /// Keys of every object under `prefix`
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Time-limited download URL for an object
    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration) -> Result<String>;
}

/// S3-backed object store
pub struct S3Store {
    client: S3Client,
}

impl S3Store {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        self.client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map(|output| output.body)
            .map_err(|err| get_object_error(bucket, key, err))
    }
}

fn get_object_error<R>(bucket: &str, key: &str, err: SdkError<GetObjectError, R>) -> AnalyzerError
where
    R: std::fmt::Debug,
{
    if err.as_service_error().is_some_and(GetObjectError::is_no_such_key) {
        return AnalyzerError::NotFound(format!("s3://{}/{}", bucket, key));
    }
    AnalyzerError::transport(
        format!("Failed to get s3://{}/{}", bucket, key),
        DisplayErrorContext(&err),
    )
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64> {
        tracing::info!("Downloading s3://{}/{} to {}", bucket, key, dest.display());

        let mut body = self.fetch(bucket, key).await?;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;

        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| AnalyzerError::transport("Failed to read S3 object body", e))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        tracing::debug!("Reading s3://{}/{}", bucket, key);

        let body = self.fetch(bucket, key).await?;
        let bytes = body
            .collect()
            .await
            .map_err(|e| AnalyzerError::transport("Failed to read S3 object body", e))?;

        Ok(bytes.into_bytes().to_vec())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        tracing::info!("Uploading {} bytes to s3://{}/{}", body.len(), bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| {
                AnalyzerError::transport(
                    format!("Failed to upload s3://{}/{}", bucket, key),
                    DisplayErrorContext(&err),
                )
            })?;

        Ok(())
    }

    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|err| {
                AnalyzerError::transport(
                    format!("Failed to list s3://{}/{}", bucket, prefix),
                    DisplayErrorContext(&err),
                )
            })?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );
        }

        Ok(keys)
    }

    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| AnalyzerError::Configuration(format!("Invalid presign lifetime: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|err| {
                AnalyzerError::transport(
                    format!("Failed to presign s3://{}/{}", bucket, key),
                    DisplayErrorContext(&err),
                )
            })?;

        Ok(request.uri().to_string())
    }
}
