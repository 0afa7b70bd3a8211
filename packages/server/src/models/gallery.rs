use chrono::{DateTime, Utc};
use common::reconcile::{Identity, Intent, PersistedRecord, Reconcilable, WireId, resolve_identity};
use common::storage::BlobKey;
use serde::{Deserialize, Serialize};

use super::shared::{
    blob_refs, check_blob_key, check_optional_text, check_url, double_option, patch_matches,
    require,
};
use crate::entity::gallery_item;

/// One photo or video of a submitted gallery. List order is display order.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct GalleryInput {
    /// Stored id, or a `temp-` placeholder for an item not saved yet.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "temp-1712345")]
    pub id: Option<WireId<i32>>,
    #[schema(example = "https://cdn.example.com/media/beach.jpg")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub caption: Option<Option<String>>,
    /// Object-storage key of uploaded media. `null` detaches it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, example = "gallery/2024/beach.jpg")]
    pub blob_key: Option<Option<String>>,
}

impl Reconcilable for GalleryInput {
    type Key = i32;
    type Row = gallery_item::Model;

    fn identity(&self) -> Identity<i32> {
        resolve_identity(self.id.as_ref()).unwrap_or_default()
    }

    fn validate(&self, intent: Intent) -> Result<(), String> {
        resolve_identity(self.id.as_ref())?;
        if intent == Intent::Create {
            require("url", &self.url)?;
        }
        if let Some(url) = &self.url {
            check_url("url", url)?;
        }
        check_optional_text("caption", &self.caption, 500)?;
        check_blob_key(&self.blob_key)
    }

    fn blob_refs(&self) -> Vec<BlobKey> {
        blob_refs(self.blob_key.as_ref().and_then(|k| k.as_deref()))
    }

    fn is_reflected_in(&self, row: &gallery_item::Model) -> bool {
        self.url.as_ref().is_none_or(|u| u.trim() == row.url)
            && patch_matches(&self.caption, &row.caption)
            && patch_matches(&self.blob_key, &row.blob_key)
    }
}

impl PersistedRecord for gallery_item::Model {
    type Key = i32;

    fn key(&self) -> i32 {
        self.id
    }

    fn ordinal(&self) -> Option<i32> {
        Some(self.position)
    }

    fn blob_refs(&self) -> Vec<BlobKey> {
        blob_refs(self.blob_key.as_deref())
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct GalleryRequest {
    /// The complete desired gallery, in display order.
    pub items: Vec<GalleryInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GalleryItemResponse {
    pub id: i32,
    pub url: String,
    pub caption: Option<String>,
    pub blob_key: Option<String>,
    #[schema(example = 0)]
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<gallery_item::Model> for GalleryItemResponse {
    fn from(m: gallery_item::Model) -> Self {
        Self {
            id: m.id,
            url: m.url,
            caption: m.caption,
            blob_key: m.blob_key,
            position: m.position,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
