use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::identity::{self, Planned};
use super::record::{Intent, PersistedRecord, Reconcilable};
use super::store::{CollectionStore, KeyOf, RowOf, StoreError};
use crate::cache::CacheStore;
use crate::storage::{BlobKey, BlobStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemErrorKind {
    /// A required field is missing or a present field is malformed.
    Validation,
    /// The store refused the write.
    Rejected,
}

/// A per-record failure. The record was skipped; its siblings were not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct ItemError {
    /// Index in the submitted list. Absent for deletions.
    #[schema(example = 2)]
    pub position: Option<usize>,
    /// Identity of the record, when it has one.
    #[schema(example = "17")]
    pub id: Option<String>,
    pub kind: ItemErrorKind,
    #[schema(example = "title is required")]
    pub message: String,
}

/// Outcome of one reconciliation call.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileSummary<K> {
    pub collection: &'static str,
    pub created: Vec<K>,
    pub updated: Vec<K>,
    /// Matched records whose stored state already equalled the submission.
    pub unchanged: Vec<K>,
    pub deleted: Vec<K>,
    pub blobs_deleted: usize,
    pub errors: Vec<ItemError>,
}

impl<K> ReconcileSummary<K> {
    fn new(collection: &'static str) -> Self {
        Self {
            collection,
            created: Vec::new(),
            updated: Vec::new(),
            unchanged: Vec::new(),
            deleted: Vec::new(),
            blobs_deleted: 0,
            errors: Vec::new(),
        }
    }

    /// Whether any row was written.
    pub fn mutated(&self) -> bool {
        !(self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The store became unusable; remaining steps were abandoned.
    #[error("{family} storage failed: {message}")]
    Storage {
        family: &'static str,
        message: String,
    },

    #[error("{family}: {count} records exceed the ordinal range")]
    TooManyRecords { family: &'static str, count: usize },
}

/// Blobs freed by row mutations, minus those something still references.
#[derive(Default)]
struct BlobCleanup {
    released: Vec<BlobKey>,
    retained: HashSet<BlobKey>,
}

impl BlobCleanup {
    fn release(&mut self, keys: impl IntoIterator<Item = BlobKey>) {
        self.released.extend(keys);
    }

    fn retain(&mut self, keys: impl IntoIterator<Item = BlobKey>) {
        self.retained.extend(keys);
    }

    /// Released blobs nothing in this batch holds on to, once each.
    fn candidates(&self) -> Vec<BlobKey> {
        let mut seen = HashSet::new();
        self.released
            .iter()
            .filter(|key| !self.retained.contains(*key) && seen.insert(*key))
            .cloned()
            .collect()
    }

    /// Delete every candidate. Failures are logged and swallowed: the
    /// relational state is authoritative.
    async fn run(self, blobs: &dyn BlobStore) -> usize {
        let mut deleted = 0;
        for key in self.candidates() {
            match blobs.delete(&key).await {
                Ok(true) => {
                    debug!(blob = %key, "Deleted orphaned blob");
                    deleted += 1;
                }
                Ok(false) => debug!(blob = %key, "Orphaned blob already absent"),
                Err(e) => warn!(
                    blob = %key,
                    error = %e,
                    transient = e.is_transient(),
                    "Blob cleanup failed; leaving orphan"
                ),
            }
        }
        deleted
    }
}

/// Bookkeeping of one reconciliation call.
struct Progress<K, R> {
    summary: ReconcileSummary<K>,
    cleanup: BlobCleanup,
    /// Rows left in the collection, with the incoming position they answer to.
    placed: Vec<(usize, R)>,
    /// Rows that should have been deleted but the store refused.
    stranded: Vec<R>,
    /// Ordinal-only writes.
    repositioned: usize,
}

impl<K, R> Progress<K, R> {
    fn new(collection: &'static str) -> Self {
        Self {
            summary: ReconcileSummary::new(collection),
            cleanup: BlobCleanup::default(),
            placed: Vec::new(),
            stranded: Vec::new(),
            repositioned: 0,
        }
    }

    fn wrote(&self) -> bool {
        self.summary.mutated() || self.repositioned > 0
    }
}

/// Applies a desired state to one collection through its ports.
pub struct Reconciler<'a, S: CollectionStore> {
    store: &'a S,
    blobs: &'a dyn BlobStore,
    cache: &'a dyn CacheStore,
}

impl<'a, S: CollectionStore> Reconciler<'a, S> {
    pub fn new(store: &'a S, blobs: &'a dyn BlobStore, cache: &'a dyn CacheStore) -> Self {
        Self {
            store,
            blobs,
            cache,
        }
    }

    /// Make the stored collection under `scope` match `incoming`.
    ///
    /// Per-record problems are collected in the summary and never stop the
    /// batch. A fatal store error abandons the remaining writes; blobs and
    /// cache are still settled for whatever was already written.
    #[instrument(skip_all, fields(collection = self.store.family(), scope = %scope, incoming = incoming.len()))]
    pub async fn reconcile(
        &self,
        scope: &S::Scope,
        incoming: &[S::Record],
    ) -> Result<ReconcileSummary<KeyOf<S>>, ReconcileError> {
        let family = self.store.family();
        if i32::try_from(incoming.len()).is_err() {
            return Err(ReconcileError::TooManyRecords {
                family,
                count: incoming.len(),
            });
        }

        let persisted = self.store.list(scope).await.map_err(|e| {
            error!(error = %e, "Failed to load persisted collection");
            ReconcileError::Storage {
                family,
                message: e.to_string(),
            }
        })?;

        let diff = identity::diff(incoming, persisted);
        for position in &diff.superseded {
            warn!(position, "Duplicate id in submission; a later occurrence wins");
        }

        let mut progress: Progress<KeyOf<S>, RowOf<S>> = Progress::new(family);
        for record in incoming {
            progress.cleanup.retain(record.blob_refs());
        }

        let creates: Vec<_> = diff
            .to_create
            .into_iter()
            .filter(|planned| accept(planned, Intent::Create, &mut progress.summary))
            .collect();
        let mut updates = Vec::with_capacity(diff.to_update.len());
        let mut skipped = Vec::new();
        for (planned, row) in diff.to_update {
            if accept(&planned, Intent::Update, &mut progress.summary) {
                updates.push((planned, row));
            } else {
                progress.cleanup.retain(row.blob_refs());
                skipped.push((planned.position, row));
            }
        }

        // Matched rows that failed validation stay in the collection, so they
        // are ranked with the rest.
        let ordinals = if self.store.ordered() {
            assign_ordinals(
                creates
                    .iter()
                    .map(|p| p.position)
                    .chain(updates.iter().map(|(p, _)| p.position))
                    .chain(skipped.iter().map(|(position, _)| *position)),
            )
        } else {
            HashMap::new()
        };
        progress.placed.extend(skipped);

        let mut outcome = self
            .apply(scope, diff.to_delete, creates, updates, &ordinals, &mut progress)
            .await;
        if outcome.is_ok() && self.store.ordered() {
            outcome = self.settle_ordinals(scope, &mut progress).await;
        }

        if outcome.is_ok() || progress.wrote() {
            self.spare_referenced(&mut progress.cleanup).await;
            progress.summary.blobs_deleted = progress.cleanup.run(self.blobs).await;
            self.invalidate(scope).await;
        }

        let summary = progress.summary;
        match outcome {
            Ok(()) => {
                info!(
                    created = summary.created.len(),
                    updated = summary.updated.len(),
                    unchanged = summary.unchanged.len(),
                    deleted = summary.deleted.len(),
                    blobs_deleted = summary.blobs_deleted,
                    errors = summary.errors.len(),
                    "Reconciliation complete"
                );
                Ok(summary)
            }
            Err(message) => {
                error!(
                    error = %message,
                    created = summary.created.len(),
                    updated = summary.updated.len(),
                    deleted = summary.deleted.len(),
                    "Reconciliation aborted"
                );
                Err(ReconcileError::Storage { family, message })
            }
        }
    }

    /// Deletes, then creates, then updates. Returns the fatal store message, if any.
    async fn apply(
        &self,
        scope: &S::Scope,
        to_delete: Vec<RowOf<S>>,
        creates: Vec<Planned<'_, S::Record>>,
        updates: Vec<(Planned<'_, S::Record>, RowOf<S>)>,
        ordinals: &HashMap<usize, i32>,
        progress: &mut Progress<KeyOf<S>, RowOf<S>>,
    ) -> Result<(), String> {
        let mut deletes = to_delete.into_iter();
        while let Some(row) = deletes.next() {
            let key = row.key();
            match self.store.delete(scope, &key).await {
                Ok(()) => {
                    debug!(id = %key, "Deleted");
                    progress.cleanup.release(row.blob_refs());
                    progress.summary.deleted.push(key);
                }
                Err(StoreError::NotFound) => {
                    debug!(id = %key, "Already deleted");
                    progress.cleanup.release(row.blob_refs());
                    progress.summary.deleted.push(key);
                }
                Err(StoreError::Rejected(message)) => {
                    warn!(id = %key, error = %message, "Delete rejected");
                    progress.cleanup.retain(row.blob_refs());
                    progress.summary.errors.push(ItemError {
                        position: None,
                        id: Some(key.to_string()),
                        kind: ItemErrorKind::Rejected,
                        message,
                    });
                    progress.stranded.push(row);
                }
                Err(StoreError::Fatal(message)) => {
                    progress.cleanup.retain(row.blob_refs());
                    for row in deletes {
                        progress.cleanup.retain(row.blob_refs());
                    }
                    for (_, row) in &updates {
                        progress.cleanup.retain(row.blob_refs());
                    }
                    return Err(message);
                }
            }
        }

        for planned in creates {
            let ordinal = ordinals.get(&planned.position).copied();
            match self.store.create(scope, planned.record, ordinal).await {
                Ok(row) => {
                    debug!(id = %row.key(), position = planned.position, "Created");
                    progress.cleanup.retain(row.blob_refs());
                    progress.summary.created.push(row.key());
                    progress.placed.push((planned.position, row));
                }
                Err(StoreError::Fatal(message)) => {
                    for (_, row) in &updates {
                        progress.cleanup.retain(row.blob_refs());
                    }
                    return Err(message);
                }
                Err(e) => {
                    let message = match e {
                        StoreError::Rejected(message) => message,
                        _ => "Owning scope no longer exists".to_string(),
                    };
                    warn!(position = planned.position, error = %message, "Create rejected");
                    progress.summary.errors.push(ItemError {
                        position: Some(planned.position),
                        id: None,
                        kind: ItemErrorKind::Rejected,
                        message,
                    });
                }
            }
        }

        let mut updates = updates.into_iter();
        while let Some((planned, current)) = updates.next() {
            let key = current.key();
            let ordinal = ordinals.get(&planned.position).copied();
            let ordinal_settled = ordinal.is_none() || current.ordinal() == ordinal;
            if ordinal_settled && planned.record.is_reflected_in(&current) {
                progress.cleanup.retain(current.blob_refs());
                progress.summary.unchanged.push(key);
                progress.placed.push((planned.position, current));
                continue;
            }

            match self.store.update(scope, &current, planned.record, ordinal).await {
                Ok(row) => {
                    debug!(id = %key, position = planned.position, "Updated");
                    progress.cleanup.release(current.blob_refs());
                    progress.cleanup.retain(row.blob_refs());
                    progress.summary.updated.push(key);
                    progress.placed.push((planned.position, row));
                }
                Err(StoreError::NotFound) => {
                    debug!(id = %key, "Row vanished before update; skipping");
                    progress.cleanup.release(current.blob_refs());
                }
                Err(StoreError::Rejected(message)) => {
                    warn!(id = %key, error = %message, "Update rejected");
                    progress.cleanup.retain(current.blob_refs());
                    progress.summary.errors.push(ItemError {
                        position: Some(planned.position),
                        id: Some(key.to_string()),
                        kind: ItemErrorKind::Rejected,
                        message,
                    });
                    progress.placed.push((planned.position, current));
                }
                Err(StoreError::Fatal(message)) => {
                    progress.cleanup.retain(current.blob_refs());
                    for (_, row) in updates {
                        progress.cleanup.retain(row.blob_refs());
                    }
                    return Err(message);
                }
            }
        }

        Ok(())
    }

    /// Rewrite ordinals so the stored rows read `0..n` in incoming order.
    /// Rows whose delete was refused go last.
    async fn settle_ordinals(
        &self,
        scope: &S::Scope,
        progress: &mut Progress<KeyOf<S>, RowOf<S>>,
    ) -> Result<(), String> {
        let mut placed = std::mem::take(&mut progress.placed);
        placed.sort_by_key(|(position, _)| *position);
        let stranded = std::mem::take(&mut progress.stranded);
        let rows = placed.into_iter().map(|(_, row)| row).chain(stranded);

        for (rank, row) in rows.enumerate() {
            let ordinal = i32::try_from(rank).unwrap_or(i32::MAX);
            if row.ordinal() == Some(ordinal) {
                continue;
            }
            let key = row.key();
            match self.store.reposition(scope, &row, ordinal).await {
                Ok(_) => {
                    debug!(id = %key, ordinal, "Repositioned");
                    progress.repositioned += 1;
                    let summary = &mut progress.summary;
                    if let Some(i) = summary.unchanged.iter().position(|k| *k == key) {
                        summary.unchanged.remove(i);
                        summary.updated.push(key);
                    }
                }
                Err(StoreError::NotFound) => debug!(id = %key, "Row vanished before repositioning"),
                Err(StoreError::Rejected(message)) => {
                    warn!(id = %key, ordinal, error = %message, "Reposition rejected");
                }
                Err(StoreError::Fatal(message)) => return Err(message),
            }
        }
        Ok(())
    }

    /// Keep released blobs that rows outside this batch still reference.
    async fn spare_referenced(&self, cleanup: &mut BlobCleanup) {
        let candidates = cleanup.candidates();
        if candidates.is_empty() {
            return;
        }
        match self.store.referenced_blobs(&candidates).await {
            Ok(referenced) => {
                if !referenced.is_empty() {
                    debug!(count = referenced.len(), "Keeping blobs other rows still reference");
                }
                cleanup.retain(referenced);
            }
            Err(e) => {
                warn!(error = %e, "Blob reference check failed; keeping released blobs");
                cleanup.retain(candidates);
            }
        }
    }

    async fn invalidate(&self, scope: &S::Scope) {
        let key = self.store.cache_key(scope);
        match self.cache.invalidate(&key).await {
            Ok(()) => debug!(cache_key = %key, "Cache invalidated"),
            Err(e) => warn!(
                cache_key = %key,
                error = %e,
                "Cache invalidation failed; entry will expire by TTL"
            ),
        }
    }
}

/// Validate a planned record, recording a failure in `summary`.
fn accept<K, R: Reconcilable>(
    planned: &Planned<'_, R>,
    intent: Intent,
    summary: &mut ReconcileSummary<K>,
) -> bool {
    match planned.record.validate(intent) {
        Ok(()) => true,
        Err(message) => {
            debug!(position = planned.position, error = %message, "Record failed validation");
            summary.errors.push(ItemError {
                position: Some(planned.position),
                id: planned.record.identity().key().map(ToString::to_string),
                kind: ItemErrorKind::Validation,
                message,
            });
            false
        }
    }
}

/// Dense ordinals over the given incoming positions, in submission order.
fn assign_ordinals(positions: impl Iterator<Item = usize>) -> HashMap<usize, i32> {
    let mut positions: Vec<usize> = positions.collect();
    positions.sort_unstable();
    positions
        .into_iter()
        .enumerate()
        .map(|(rank, position)| (position, i32::try_from(rank).unwrap_or(i32::MAX)))
        .collect()
}
