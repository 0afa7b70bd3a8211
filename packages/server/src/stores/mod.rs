//! SeaORM adapters of the collection storage port, one per entity family.

mod coupon;
mod gallery;
mod timeline;

pub use coupon::CouponStore;
pub use gallery::GalleryStore;
pub use timeline::TimelineStore;

use std::collections::HashSet;

use common::reconcile::StoreError;
use common::storage::BlobKey;
use sea_orm::*;

use crate::entity::{gallery_item, timeline_event};

/// Classify a database error for the reconciler.
///
/// Constraint violations affect only the row being written. A missing row is
/// benign. Anything else means the store cannot be trusted for the rest of
/// the batch.
pub(crate) fn store_error(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg))
        | Some(SqlErr::ForeignKeyConstraintViolation(msg)) => return StoreError::Rejected(msg),
        _ => {}
    }
    match err {
        DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => StoreError::NotFound,
        other => StoreError::Fatal(other.to_string()),
    }
}

/// Blob keys among `keys` that any gallery or timeline row references.
pub(crate) async fn blob_references<C: ConnectionTrait>(
    db: &C,
    keys: Vec<String>,
) -> Result<HashSet<String>, DbErr> {
    if keys.is_empty() {
        return Ok(HashSet::new());
    }

    let mut referenced: HashSet<String> = HashSet::new();
    referenced.extend(
        gallery_item::Entity::find()
            .filter(gallery_item::Column::BlobKey.is_in(keys.clone()))
            .all(db)
            .await?
            .into_iter()
            .filter_map(|m| m.blob_key),
    );
    referenced.extend(
        timeline_event::Entity::find()
            .filter(timeline_event::Column::BlobKey.is_in(keys))
            .all(db)
            .await?
            .into_iter()
            .filter_map(|m| m.blob_key),
    );
    Ok(referenced)
}

/// [`blob_references`] for the reconciler's typed keys.
pub(crate) async fn referenced_keys<C: ConnectionTrait>(
    db: &C,
    keys: &[BlobKey],
) -> Result<HashSet<BlobKey>, StoreError> {
    let raw = keys.iter().map(|k| k.as_str().to_string()).collect();
    let held = blob_references(db, raw).await.map_err(store_error)?;
    Ok(keys
        .iter()
        .filter(|k| held.contains(k.as_str()))
        .cloned()
        .collect())
}
