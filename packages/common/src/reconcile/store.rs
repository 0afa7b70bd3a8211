use std::collections::HashSet;
use std::fmt::Display;

use async_trait::async_trait;
use thiserror::Error;

use super::record::Reconcilable;
use crate::storage::BlobKey;

/// Key type of a store's records.
pub type KeyOf<S> = <<S as CollectionStore>::Record as Reconcilable>::Key;
/// Row type of a store's records.
pub type RowOf<S> = <<S as CollectionStore>::Record as Reconcilable>::Row;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The target row is already gone.
    #[error("record not found")]
    NotFound,

    /// The store refused this one write; sibling writes may still succeed.
    #[error("write rejected: {0}")]
    Rejected(String),

    /// The store is unreachable or failed structurally; nothing further can succeed.
    #[error("storage failure: {0}")]
    Fatal(String),
}

/// Transactional CRUD over one entity family, scoped to an owning parent.
///
/// Each operation touches a single row and is safe to retry: deleting or
/// updating a row that no longer exists yields [`StoreError::NotFound`].
#[async_trait]
pub trait CollectionStore: Send + Sync {
    type Scope: Display + Send + Sync;
    type Record: Reconcilable + Send + Sync;

    /// Short family name used in logs, cache keys and responses.
    fn family(&self) -> &'static str;

    /// Whether rows carry an explicit ordinal.
    fn ordered(&self) -> bool;

    /// Cache key of the read view derived from this collection.
    fn cache_key(&self, scope: &Self::Scope) -> String {
        format!("config:{scope}:{}", self.family())
    }

    /// Committed rows of the collection.
    async fn list(&self, scope: &Self::Scope) -> Result<Vec<RowOf<Self>>, StoreError>;

    async fn create(
        &self,
        scope: &Self::Scope,
        record: &Self::Record,
        ordinal: Option<i32>,
    ) -> Result<RowOf<Self>, StoreError>;

    /// Apply the fields present in `record` (and the ordinal, if any) to `current`.
    async fn update(
        &self,
        scope: &Self::Scope,
        current: &RowOf<Self>,
        record: &Self::Record,
        ordinal: Option<i32>,
    ) -> Result<RowOf<Self>, StoreError>;

    async fn delete(&self, scope: &Self::Scope, key: &KeyOf<Self>) -> Result<(), StoreError>;

    /// Move `current` to `ordinal`, leaving its other fields alone.
    ///
    /// Only called for ordered families.
    async fn reposition(
        &self,
        scope: &Self::Scope,
        current: &RowOf<Self>,
        ordinal: i32,
    ) -> Result<RowOf<Self>, StoreError> {
        let _ = (scope, current, ordinal);
        Err(StoreError::Rejected(format!(
            "{} rows carry no ordinal",
            self.family()
        )))
    }

    /// The subset of `keys` that committed rows still reference, in this
    /// collection or any other family sharing the blob store.
    async fn referenced_blobs(&self, keys: &[BlobKey]) -> Result<HashSet<BlobKey>, StoreError> {
        let _ = keys;
        Ok(HashSet::new())
    }
}
