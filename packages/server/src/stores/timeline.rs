use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use common::reconcile::{CollectionStore, StoreError};
use common::storage::BlobKey;
use sea_orm::*;

use super::{referenced_keys, store_error};
use crate::entity::timeline_event;
use crate::models::shared::{trimmed, trimmed_patch};
use crate::models::timeline::{TimelineInput, parse_date};

/// Timeline events of one configuration, kept in display order.
pub struct TimelineStore {
    db: DatabaseConnection,
}

impl TimelineStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CollectionStore for TimelineStore {
    type Scope = i32;
    type Record = TimelineInput;

    fn family(&self) -> &'static str {
        "timeline"
    }

    fn ordered(&self) -> bool {
        true
    }

    async fn list(&self, config_id: &i32) -> Result<Vec<timeline_event::Model>, StoreError> {
        timeline_event::Entity::find()
            .filter(timeline_event::Column::ConfigId.eq(*config_id))
            .order_by_asc(timeline_event::Column::Position)
            .order_by_asc(timeline_event::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)
    }

    async fn create(
        &self,
        config_id: &i32,
        record: &TimelineInput,
        ordinal: Option<i32>,
    ) -> Result<timeline_event::Model, StoreError> {
        let title = record
            .title
            .as_deref()
            .map(trimmed)
            .ok_or_else(|| StoreError::Rejected("title is required".into()))?;
        let occurred_on = record
            .occurred_on
            .as_deref()
            .ok_or_else(|| StoreError::Rejected("occurred_on is required".into()))
            .and_then(|raw| parse_date(raw).map_err(StoreError::Rejected))?;
        let now = Utc::now();
        let model = timeline_event::ActiveModel {
            config_id: Set(*config_id),
            title: Set(title),
            occurred_on: Set(occurred_on),
            description: Set(trimmed_patch(&record.description).flatten()),
            image_url: Set(trimmed_patch(&record.image_url).flatten()),
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
        current: &timeline_event::Model,
        record: &TimelineInput,
        ordinal: Option<i32>,
    ) -> Result<timeline_event::Model, StoreError> {
        let mut active: timeline_event::ActiveModel = current.clone().into();
        if let Some(title) = &record.title {
            active.title = Set(trimmed(title));
        }
        if let Some(raw) = &record.occurred_on {
            active.occurred_on = Set(parse_date(raw).map_err(StoreError::Rejected)?);
        }
        if let Some(description) = trimmed_patch(&record.description) {
            active.description = Set(description);
        }
        if let Some(image_url) = trimmed_patch(&record.image_url) {
            active.image_url = Set(image_url);
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
        let result = timeline_event::Entity::delete_many()
            .filter(timeline_event::Column::Id.eq(*id))
            .filter(timeline_event::Column::ConfigId.eq(*config_id))
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
        current: &timeline_event::Model,
        ordinal: i32,
    ) -> Result<timeline_event::Model, StoreError> {
        let mut active: timeline_event::ActiveModel = current.clone().into();
        active.position = Set(ordinal);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(store_error)
    }

    async fn referenced_blobs(&self, keys: &[BlobKey]) -> Result<HashSet<BlobKey>, StoreError> {
        referenced_keys(&self.db, keys).await
    }
}
