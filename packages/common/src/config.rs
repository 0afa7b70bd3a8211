use std::path::PathBuf;

use serde::Deserialize;

/// Which object store backs blob cleanup.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    S3,
}

/// Connection settings for an S3-compatible bucket.
#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    pub bucket: String,
    /// Region name. Default: "us-east-1".
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// Endpoint URL, e.g. "http://localhost:9000" for MinIO.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    /// Use path-style addressing. Default: true.
    #[serde(default = "default_s3_path_style")]
    pub path_style: bool,
    /// Key prefix inside the bucket. Default: "".
    #[serde(default)]
    pub prefix: String,
}

fn default_s3_region() -> String {
    "us-east-1".into()
}
fn default_s3_path_style() -> bool {
    true
}

/// App-level blob storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageAppConfig {
    /// Default: filesystem.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend. Default: "./data/blobs".
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    /// Largest blob accepted by `put`. Default: 64 MiB.
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
    /// Required when `backend = "s3"`.
    #[serde(default)]
    pub s3: Option<S3Config>,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_max_blob_size() -> u64 {
    64 * 1024 * 1024
}

impl Default for StorageAppConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
            max_blob_size: default_max_blob_size(),
            s3: None,
        }
    }
}

/// App-level cache configuration for derived read views.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheAppConfig {
    /// Entry freshness bound in seconds. Default: 60.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    /// Maximum number of cached views. Default: 10000.
    #[serde(default = "default_cache_max_capacity")]
    pub max_capacity: u64,
}

fn default_cache_ttl_secs() -> u64 {
    60
}
fn default_cache_max_capacity() -> u64 {
    10_000
}

impl Default for CacheAppConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            max_capacity: default_cache_max_capacity(),
        }
    }
}
