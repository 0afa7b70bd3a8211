use common::reconcile::{ItemError, ReconcileSummary};
use serde::Serialize;

/// Outcome of reconciling one collection.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ReconcileResponse {
    /// Collection family: `coupons`, `gallery` or `timeline`.
    #[schema(example = "gallery")]
    pub collection: String,
    /// Ids of created records, in submission order.
    pub created: Vec<i32>,
    pub updated: Vec<i32>,
    /// Matched records that already had the submitted values.
    pub unchanged: Vec<i32>,
    pub deleted: Vec<i32>,
    /// Orphaned blobs removed from object storage.
    pub blobs_deleted: usize,
    /// Records that were skipped. The rest of the batch was applied.
    pub errors: Vec<ItemError>,
}

impl From<ReconcileSummary<i32>> for ReconcileResponse {
    fn from(s: ReconcileSummary<i32>) -> Self {
        Self {
            collection: s.collection.to_string(),
            created: s.created,
            updated: s.updated,
            unchanged: s.unchanged,
            deleted: s.deleted,
            blobs_deleted: s.blobs_deleted,
            errors: s.errors,
        }
    }
}
