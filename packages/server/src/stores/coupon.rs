use async_trait::async_trait;
use chrono::Utc;
use common::reconcile::{CollectionStore, StoreError};
use sea_orm::*;

use super::store_error;
use crate::entity::coupon;
use crate::models::coupon::CouponInput;
use crate::models::shared::{trimmed, trimmed_patch};

/// Coupons of one configuration. Unordered.
pub struct CouponStore {
    db: DatabaseConnection,
}

impl CouponStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CollectionStore for CouponStore {
    type Scope = i32;
    type Record = CouponInput;

    fn family(&self) -> &'static str {
        "coupons"
    }

    fn ordered(&self) -> bool {
        false
    }

    async fn list(&self, config_id: &i32) -> Result<Vec<coupon::Model>, StoreError> {
        coupon::Entity::find()
            .filter(coupon::Column::ConfigId.eq(*config_id))
            .order_by_asc(coupon::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)
    }

    async fn create(
        &self,
        config_id: &i32,
        record: &CouponInput,
        _ordinal: Option<i32>,
    ) -> Result<coupon::Model, StoreError> {
        let title = record
            .title
            .as_deref()
            .map(trimmed)
            .ok_or_else(|| StoreError::Rejected("title is required".into()))?;
        let now = Utc::now();
        let model = coupon::ActiveModel {
            config_id: Set(*config_id),
            title: Set(title),
            description: Set(trimmed_patch(&record.description).flatten()),
            emoji: Set(trimmed_patch(&record.emoji).flatten()),
            redeemed: Set(record.redeemed.unwrap_or(false)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        model.insert(&self.db).await.map_err(store_error)
    }

    async fn update(
        &self,
        _config_id: &i32,
        current: &coupon::Model,
        record: &CouponInput,
        _ordinal: Option<i32>,
    ) -> Result<coupon::Model, StoreError> {
        let mut active: coupon::ActiveModel = current.clone().into();
        if let Some(title) = &record.title {
            active.title = Set(trimmed(title));
        }
        if let Some(description) = trimmed_patch(&record.description) {
            active.description = Set(description);
        }
        if let Some(emoji) = trimmed_patch(&record.emoji) {
            active.emoji = Set(emoji);
        }
        if let Some(redeemed) = record.redeemed {
            active.redeemed = Set(redeemed);
        }
        active.updated_at = Set(Utc::now());

        active.update(&self.db).await.map_err(store_error)
    }

    async fn delete(&self, config_id: &i32, id: &i32) -> Result<(), StoreError> {
        let result = coupon::Entity::delete_many()
            .filter(coupon::Column::Id.eq(*id))
            .filter(coupon::Column::ConfigId.eq(*config_id))
            .exec(&self.db)
            .await
            .map_err(store_error)?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
