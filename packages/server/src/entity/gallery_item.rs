use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gallery_item")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub config_id: i32,
    #[sea_orm(belongs_to, from = "config_id", to = "id")]
    pub config: HasOne<super::app_config::Entity>,

    #[sea_orm(column_type = "Text")]
    pub url: String,
    pub caption: Option<String>,
    /// Object-storage key of the uploaded media, if hosted by us.
    pub blob_key: Option<String>,

    #[sea_orm(default_value = 0)]
    pub position: i32,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
