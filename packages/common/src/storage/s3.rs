use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};

use super::error::StorageError;
use super::key::BlobKey;
use super::traits::BlobStore;
use crate::config::S3Config;

/// S3-compatible object store (AWS, MinIO, R2).
pub struct S3BlobStore {
    bucket: Box<Bucket>,
    prefix: String,
}

impl S3BlobStore {
    pub fn new(config: &S3Config) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid S3 credentials: {e}")))?;

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let bucket = if config.path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        Ok(Self {
            bucket,
            prefix: config.prefix.trim_matches('/').to_string(),
        })
    }

    fn object_path(&self, key: &BlobKey) -> String {
        if self.prefix.is_empty() {
            format!("/{key}")
        } else {
            format!("/{}/{key}", self.prefix)
        }
    }
}

fn backend(err: s3::error::S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn unexpected_status(op: &str, status: u16) -> StorageError {
    StorageError::Backend(format!("{op} returned HTTP {status}"))
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &BlobKey, data: &[u8]) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object(self.object_path(key), data)
            .await
            .map_err(backend)?;
        match response.status_code() {
            200..=299 => Ok(()),
            status => Err(unexpected_status("PUT", status)),
        }
    }

    async fn exists(&self, key: &BlobKey) -> Result<bool, StorageError> {
        let (_, status) = self
            .bucket
            .head_object(self.object_path(key))
            .await
            .map_err(backend)?;
        match status {
            200..=299 => Ok(true),
            404 => Ok(false),
            status => Err(unexpected_status("HEAD", status)),
        }
    }

    async fn delete(&self, key: &BlobKey) -> Result<bool, StorageError> {
        let response = self
            .bucket
            .delete_object(self.object_path(key))
            .await
            .map_err(backend)?;
        // S3 answers 204 whether or not the object existed.
        match response.status_code() {
            200..=299 => Ok(true),
            404 => Ok(false),
            status => Err(unexpected_status("DELETE", status)),
        }
    }
}
