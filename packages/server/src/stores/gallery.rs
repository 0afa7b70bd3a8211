use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use common::reconcile::{CollectionStore, StoreError};
use common::storage::BlobKey;
use sea_orm::*;

use super::{referenced_keys, store_error};
use crate::entity::gallery_item;
use crate::models::gallery::GalleryInput;
use crate::models::shared::{trimmed, trimmed_patch};

/// Gallery media of one configuration, kept in display order.
pub struct GalleryStore {
    db: DatabaseConnection,
}

impl GalleryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CollectionStore for GalleryStore {
    type Scope = i32;
    type Record = GalleryInput;

    fn family(&self) -> &'static str {
        "gallery"
    }

    fn ordered(&self) -> bool {
        true
    }

    async fn list(&self, config_id: &i32) -> Result<Vec<gallery_item::Model>, StoreError> {
        gallery_item::Entity::find()
            .filter(gallery_item::Column::ConfigId.eq(*config_id))
            .order_by_asc(gallery_item::Column::Position)
            .order_by_asc(gallery_item::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)
    }

    async fn create(
        &self,
        config_id: &i32,
        record: &GalleryInput,
        ordinal: Option<i32>,
    ) -> Result<gallery_item::Model, StoreError> {
        let url = record
            .url
            .as_deref()
            .map(trimmed)
            .ok_or_else(|| StoreError::Rejected("url is required".into()))?;
        let now = Utc::now();
        let model = gallery_item::ActiveModel {
            config_id: Set(*config_id),
            url: Set(url),
            caption: Set(trimmed_patch(&record.caption).flatten()),
            blob_key: Set(trimmed_patch(&record.blob_key).flatten()),
            position: Set(ordinal.unwrap_or_default()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        model.insert(&self.db).await.map_err(store_error)
    }

    async fn update(
        &self,
        _config_id: &i32,
        current: &gallery_item::Model,
        record: &GalleryInput,
        ordinal: Option<i32>,
    ) -> Result<gallery_item::Model, StoreError> {
        let mut active: gallery_item::ActiveModel = current.clone().into();
        if let Some(url) = &record.url {
            active.url = Set(trimmed(url));
        }
        if let Some(caption) = trimmed_patch(&record.caption) {
            active.caption = Set(caption);
        }
        if let Some(blob_key) = trimmed_patch(&record.blob_key) {
            active.blob_key = Set(blob_key);
        }
        if let Some(position) = ordinal {
            active.position = Set(position);
        }
        active.updated_at = Set(Utc::now());

        active.update(&self.db).await.map_err(store_error)
    }

    async fn delete(&self, config_id: &i32, id: &i32) -> Result<(), StoreError> {
        let result = gallery_item::Entity::delete_many()
            .filter(gallery_item::Column::Id.eq(*id))
            .filter(gallery_item::Column::ConfigId.eq(*config_id))
            .exec(&self.db)
            .await
            .map_err(store_error)?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn reposition(
        &self,
        _config_id: &i32,
        current: &gallery_item::Model,
        ordinal: i32,
    ) -> Result<gallery_item::Model, StoreError> {
        let mut active: gallery_item::ActiveModel = current.clone().into();
        active.position = Set(ordinal);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(store_error)
    }

    async fn referenced_blobs(&self, keys: &[BlobKey]) -> Result<HashSet<BlobKey>, StoreError> {
        referenced_keys(&self.db, keys).await
    }
}
