use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::entity::{coupon, gallery_item, timeline_event};

/// Ensure the composite indexes used by collection reads exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let statements = [
        (
            "idx_gallery_item_config_position",
            Index::create()
                .if_not_exists()
                .name("idx_gallery_item_config_position")
                .table(gallery_item::Entity)
                .col(gallery_item::Column::ConfigId)
                .col(gallery_item::Column::Position)
                .to_string(PostgresQueryBuilder),
        ),
        (
            "idx_timeline_event_config_position",
            Index::create()
                .if_not_exists()
                .name("idx_timeline_event_config_position")
                .table(timeline_event::Entity)
                .col(timeline_event::Column::ConfigId)
                .col(timeline_event::Column::Position)
                .to_string(PostgresQueryBuilder),
        ),
        (
            "idx_coupon_config",
            Index::create()
                .if_not_exists()
                .name("idx_coupon_config")
                .table(coupon::Entity)
                .col(coupon::Column::ConfigId)
                .col(coupon::Column::Id)
                .to_string(PostgresQueryBuilder),
        ),
    ];

    for (name, stmt) in statements {
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) => warn!("Failed to create index {}: {}", name, e),
        }
    }

    Ok(())
}
