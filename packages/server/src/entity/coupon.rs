use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupon")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub config_id: i32,
    #[sea_orm(belongs_to, from = "config_id", to = "id")]
    pub config: HasOne<super::app_config::Entity>,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: Option<String>,
    pub emoji: Option<String>,
    #[sea_orm(default_value = false)]
    pub redeemed: bool,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
