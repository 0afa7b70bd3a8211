//! Reconciles a client-submitted collection against its stored rows.

mod identity;
mod record;
mod reconciler;
mod store;
#[cfg(test)]
mod testing;

pub use identity::{Diff, Planned, diff};
pub use record::{
    Identity, Intent, PersistedRecord, Reconcilable, TEMP_ID_PREFIX, WireId, resolve_identity,
};
pub use reconciler::{ItemError, ItemErrorKind, ReconcileError, ReconcileSummary, Reconciler};
pub use store::{CollectionStore, KeyOf, RowOf, StoreError};
