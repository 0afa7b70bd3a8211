use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "timeline_event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub config_id: i32,
    #[sea_orm(belongs_to, from = "config_id", to = "id")]
    pub config: HasOne<super::app_config::Entity>,

    pub title: String,
    pub occurred_on: Date,
    #[sea_orm(column_type = "Text")]
    pub description: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub image_url: Option<String>,
    pub blob_key: Option<String>,

    #[sea_orm(default_value = 0)]
    pub position: i32,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
