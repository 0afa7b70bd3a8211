use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::storage::BlobKey;

/// Prefix clients use for placeholder ids of records they have not saved yet.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Identity of an incoming record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Identity<K> {
    /// Refers to a stored row by its key.
    Persisted(K),
    /// Not yet stored; will be created.
    #[default]
    Pending,
}

impl<K> Identity<K> {
    pub fn key(&self) -> Option<&K> {
        match self {
            Identity::Persisted(key) => Some(key),
            Identity::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Identity::Pending)
    }
}

/// The `id` field as it arrives on the wire: either a stored key or a string
/// (a numeric key in string form, or a `temp-` placeholder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId<K> {
    Key(K),
    Text(String),
}

impl<K: FromStr + Clone> WireId<K> {
    /// Resolve the wire form to an [`Identity`], or describe why it is malformed.
    pub fn resolve(&self) -> Result<Identity<K>, String> {
        match self {
            WireId::Key(key) => Ok(Identity::Persisted(key.clone())),
            WireId::Text(text) if text.starts_with(TEMP_ID_PREFIX) => Ok(Identity::Pending),
            WireId::Text(text) => text
                .trim()
                .parse()
                .map(Identity::Persisted)
                .map_err(|_| format!("Malformed id '{text}'")),
        }
    }
}

/// Resolve an optional wire id. Absent ids are pending.
pub fn resolve_identity<K: FromStr + Clone>(
    id: Option<&WireId<K>>,
) -> Result<Identity<K>, String> {
    id.map_or(Ok(Identity::Pending), WireId::resolve)
}

/// Whether a record is about to be inserted or patched onto an existing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Create,
    Update,
}

/// A stored row of a reconciled collection.
pub trait PersistedRecord {
    type Key;

    fn key(&self) -> Self::Key;

    /// Position within an ordered collection. `None` for unordered families.
    fn ordinal(&self) -> Option<i32> {
        None
    }

    /// Object-storage blobs this row owns.
    fn blob_refs(&self) -> Vec<BlobKey> {
        Vec::new()
    }
}

/// One element of a client-submitted desired state.
pub trait Reconcilable {
    type Key: Clone + Eq + Hash + Debug + Display + Send + Sync;
    type Row: PersistedRecord<Key = Self::Key> + Send + Sync;

    /// Identity of the record. Malformed wire ids resolve to `Pending` and are
    /// reported by [`validate`](Reconcilable::validate).
    fn identity(&self) -> Identity<Self::Key>;

    /// Check the fields required for `intent`. Updates are partial: only
    /// fields that are present must be well-formed.
    fn validate(&self, intent: Intent) -> Result<(), String>;

    /// Blobs the desired state references. These are never cleaned up.
    fn blob_refs(&self) -> Vec<BlobKey> {
        Vec::new()
    }

    /// True when applying this record as a patch would not change `row`
    /// (ordinal excluded).
    fn is_reflected_in(&self, row: &Self::Row) -> bool;
}
