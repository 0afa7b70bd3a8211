use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A shared space owning the coupon, gallery and timeline collections.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "app_config")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    /// Subject of the token that created the configuration.
    #[sea_orm(indexed)]
    pub owner: String,

    #[sea_orm(has_many)]
    pub coupons: HasMany<super::coupon::Entity>,
    #[sea_orm(has_many)]
    pub gallery_items: HasMany<super::gallery_item::Entity>,
    #[sea_orm(has_many)]
    pub timeline_events: HasMany<super::timeline_event::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
