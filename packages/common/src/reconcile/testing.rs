//! In-memory doubles for the reconcile ports.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::record::{Identity, Intent, PersistedRecord, Reconcilable, WireId, resolve_identity};
use super::store::{CollectionStore, StoreError};
use crate::cache::{CacheError, CacheStore};
use crate::storage::{BlobKey, BlobStore, StorageError};

#[derive(Debug, Clone, Default)]
pub struct Note {
    pub id: Option<WireId<u32>>,
    pub title: Option<String>,
    pub blob: Option<String>,
}

impl Note {
    pub fn existing(id: u32, title: &str) -> Self {
        Self {
            id: Some(WireId::Key(id)),
            title: Some(title.into()),
            blob: None,
        }
    }

    pub fn pending(title: &str) -> Self {
        Self {
            id: None,
            title: Some(title.into()),
            blob: None,
        }
    }

    pub fn temp(temp_id: &str, title: &str) -> Self {
        Self {
            id: Some(WireId::Text(temp_id.into())),
            title: Some(title.into()),
            blob: None,
        }
    }

    pub fn untitled() -> Self {
        Self::default()
    }

    pub fn from_row(row: &NoteRow) -> Self {
        Self {
            id: Some(WireId::Key(row.id)),
            title: Some(row.title.clone()),
            blob: row.blob.clone(),
        }
    }

    pub fn with_blob(mut self, blob: &str) -> Self {
        self.blob = Some(blob.into());
        self
    }
}

impl Reconcilable for Note {
    type Key = u32;
    type Row = NoteRow;

    fn identity(&self) -> Identity<u32> {
        resolve_identity(self.id.as_ref()).unwrap_or_default()
    }

    fn validate(&self, intent: Intent) -> Result<(), String> {
        resolve_identity(self.id.as_ref())?;
        match (&self.title, intent) {
            (None, Intent::Create) => return Err("title is required".into()),
            (Some(t), _) if t.trim().is_empty() => return Err("title must not be empty".into()),
            _ => {}
        }
        if let Some(blob) = &self.blob {
            BlobKey::parse(blob.as_str()).map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn blob_refs(&self) -> Vec<BlobKey> {
        self.blob
            .iter()
            .filter_map(|b| BlobKey::parse(b.as_str()).ok())
            .collect()
    }

    fn is_reflected_in(&self, row: &NoteRow) -> bool {
        self.title.as_ref().is_none_or(|t| *t == row.title)
            && self
                .blob
                .as_ref()
                .is_none_or(|b| row.blob.as_ref() == Some(b))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteRow {
    pub id: u32,
    pub title: String,
    pub blob: Option<String>,
    pub position: Option<i32>,
}

impl NoteRow {
    pub fn new(id: u32, title: &str) -> Self {
        Self {
            id,
            title: title.into(),
            blob: None,
            position: None,
        }
    }

    pub fn at(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_blob(mut self, blob: &str) -> Self {
        self.blob = Some(blob.into());
        self
    }
}

impl PersistedRecord for NoteRow {
    type Key = u32;

    fn key(&self) -> u32 {
        self.id
    }

    fn ordinal(&self) -> Option<i32> {
        self.position
    }

    fn blob_refs(&self) -> Vec<BlobKey> {
        self.blob
            .iter()
            .filter_map(|b| BlobKey::parse(b.as_str()).ok())
            .collect()
    }
}

/// A single-scope collection held in memory, with fault injection.
#[derive(Default)]
pub struct MemoryStore {
    pub ordered: bool,
    pub rows: Mutex<Vec<NoteRow>>,
    next_id: AtomicU32,
    pub fail_list: bool,
    pub fail_deletes: bool,
    /// Zero-based index of the create call that fails fatally.
    pub fatal_on_create: Option<usize>,
    /// Titles the store refuses to write, on create and update.
    pub reject_titles: Vec<String>,
    /// Keys whose delete the store refuses.
    pub reject_deletes: Vec<u32>,
    /// Blob keys that rows outside this collection reference.
    pub external_refs: Vec<String>,
    pub fail_reference_check: bool,
    /// Keys removed behind the reconciler's back right before it deletes them.
    pub vanish: Vec<u32>,
    creates: AtomicUsize,
    pub writes: AtomicUsize,
}

impl MemoryStore {
    pub fn with_rows(ordered: bool, rows: Vec<NoteRow>) -> Self {
        let next = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        Self {
            ordered,
            rows: Mutex::new(rows),
            next_id: AtomicU32::new(next),
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> Vec<NoteRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn by_title(&self, title: &str) -> Option<NoteRow> {
        self.snapshot().into_iter().find(|r| r.title == title)
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    type Scope = u32;
    type Record = Note;

    fn family(&self) -> &'static str {
        "notes"
    }

    fn ordered(&self) -> bool {
        self.ordered
    }

    async fn list(&self, _scope: &u32) -> Result<Vec<NoteRow>, StoreError> {
        if self.fail_list {
            return Err(StoreError::Fatal("connection refused".into()));
        }
        Ok(self.snapshot())
    }

    async fn create(
        &self,
        _scope: &u32,
        record: &Note,
        ordinal: Option<i32>,
    ) -> Result<NoteRow, StoreError> {
        let call = self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fatal_on_create == Some(call) {
            return Err(StoreError::Fatal("connection reset".into()));
        }
        let title = record.title.clone().unwrap_or_default();
        if self.reject_titles.contains(&title) {
            return Err(StoreError::Rejected(format!("'{title}' violates a constraint")));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        let row = NoteRow {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            title,
            blob: record.blob.clone(),
            position: ordinal,
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        _scope: &u32,
        current: &NoteRow,
        record: &Note,
        ordinal: Option<i32>,
    ) -> Result<NoteRow, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == current.id)
            .ok_or(StoreError::NotFound)?;
        if let Some(title) = record.title.as_ref().filter(|t| self.reject_titles.contains(t)) {
            return Err(StoreError::Rejected(format!("'{title}' violates a constraint")));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(title) = &record.title {
            row.title = title.clone();
        }
        if let Some(blob) = &record.blob {
            row.blob = Some(blob.clone());
        }
        if ordinal.is_some() {
            row.position = ordinal;
        }
        Ok(row.clone())
    }

    async fn delete(&self, _scope: &u32, key: &u32) -> Result<(), StoreError> {
        if self.fail_deletes {
            return Err(StoreError::Fatal("connection refused".into()));
        }
        if self.reject_deletes.contains(key) {
            return Err(StoreError::Rejected("row is still referenced".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        if self.vanish.contains(key) {
            rows.retain(|r| r.id != *key);
        }
        let before = rows.len();
        rows.retain(|r| r.id != *key);
        if rows.len() == before {
            return Err(StoreError::NotFound);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reposition(
        &self,
        _scope: &u32,
        current: &NoteRow,
        ordinal: i32,
    ) -> Result<NoteRow, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == current.id)
            .ok_or(StoreError::NotFound)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        row.position = Some(ordinal);
        Ok(row.clone())
    }

    async fn referenced_blobs(&self, keys: &[BlobKey]) -> Result<HashSet<BlobKey>, StoreError> {
        if self.fail_reference_check {
            return Err(StoreError::Fatal("connection refused".into()));
        }
        let rows = self.rows.lock().unwrap();
        let held: HashSet<&str> = rows
            .iter()
            .filter_map(|r| r.blob.as_deref())
            .chain(self.external_refs.iter().map(String::as_str))
            .collect();
        Ok(keys
            .iter()
            .filter(|k| held.contains(k.as_str()))
            .cloned()
            .collect())
    }
}

/// Records every delete call; keys in `failing` time out.
#[derive(Default)]
pub struct RecordingBlobs {
    pub deleted: Mutex<Vec<String>>,
    pub failing: HashSet<String>,
}

impl RecordingBlobs {
    pub fn failing(keys: &[&str]) -> Self {
        Self {
            failing: keys.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for RecordingBlobs {
    async fn put(&self, _key: &BlobKey, _data: &[u8]) -> Result<(), StorageError> {
        Ok(())
    }

    async fn exists(&self, _key: &BlobKey) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn delete(&self, key: &BlobKey) -> Result<bool, StorageError> {
        self.deleted.lock().unwrap().push(key.to_string());
        if self.failing.contains(key.as_str()) {
            return Err(StorageError::Backend("request timed out".into()));
        }
        Ok(true)
    }
}

/// Counts invalidations; optionally fails them.
#[derive(Default)]
pub struct CountingCache {
    pub invalidated: Mutex<Vec<String>>,
    pub fail: bool,
}

impl CountingCache {
    pub fn calls(&self) -> Vec<String> {
        self.invalidated.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheStore for CountingCache {
    async fn get(&self, _key: &str) -> Result<Option<Arc<Value>>, CacheError> {
        Ok(None)
    }

    async fn generation(&self, _key: &str) -> Result<u64, CacheError> {
        Ok(self.invalidated.lock().unwrap().len() as u64)
    }

    async fn insert(&self, _key: &str, _value: Value, _generation: u64) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.invalidated.lock().unwrap().push(key.to_string());
        if self.fail {
            return Err(CacheError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}
