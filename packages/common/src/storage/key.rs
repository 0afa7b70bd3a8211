use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::StorageError;

/// A validated object-storage key.
///
/// Keys are opaque to the application: they are produced by the upload
/// pipeline and only ever compared for equality or handed back to a
/// [`BlobStore`](super::BlobStore).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobKey(String);

impl BlobKey {
    /// Longest key accepted, in bytes.
    pub const MAX_LEN: usize = 1024;

    /// Validate and wrap a raw key.
    pub fn parse(raw: impl Into<String>) -> Result<Self, StorageError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(StorageError::InvalidKey("key must not be empty".into()));
        }
        if raw.len() > Self::MAX_LEN {
            return Err(StorageError::InvalidKey(format!(
                "key is {} bytes, max {}",
                raw.len(),
                Self::MAX_LEN
            )));
        }
        if raw.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "key must not start with '/'".into(),
            ));
        }
        if raw.chars().any(char::is_control) {
            return Err(StorageError::InvalidKey(
                "key must not contain control characters".into(),
            ));
        }
        if raw.split('/').any(|segment| segment == "..") {
            return Err(StorageError::InvalidKey(
                "key must not contain '..' segments".into(),
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SHA-256 of the key, hex encoded. Used to lay keys out on disk.
    pub fn digest_hex(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }

    /// First 2 hex characters of the digest (shard directory).
    pub fn shard_prefix(&self) -> String {
        self.digest_hex()[..2].to_string()
    }

    /// Remaining 62 hex characters of the digest (file name within shard).
    pub fn shard_suffix(&self) -> String {
        self.digest_hex()[2..].to_string()
    }
}

impl fmt::Debug for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobKey({})", self.0)
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlobKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for BlobKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlobKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(s).map_err(serde::de::Error::custom)
    }
}
