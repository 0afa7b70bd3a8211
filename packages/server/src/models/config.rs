use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::coupon::{CouponInput, CouponResponse};
use super::gallery::{GalleryInput, GalleryItemResponse};
use super::reconcile::ReconcileResponse;
use super::timeline::{TimelineEventResponse, TimelineInput};
use crate::entity::app_config;

pub use super::shared::validate_title;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateConfigRequest {
    #[schema(example = "Alex & Sam")]
    pub title: String,
}

/// Configuration update. Each present collection replaces the stored one.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateConfigRequest {
    pub title: Option<String>,
    pub coupons: Option<Vec<CouponInput>>,
    pub gallery: Option<Vec<GalleryInput>>,
    pub timeline: Option<Vec<TimelineInput>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ConfigResponse {
    #[schema(example = 1)]
    pub id: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<app_config::Model> for ConfigResponse {
    fn from(m: app_config::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// A configuration with all of its collections.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ConfigView {
    #[serde(flatten)]
    pub config: ConfigResponse,
    pub coupons: Vec<CouponResponse>,
    pub gallery: Vec<GalleryItemResponse>,
    pub timeline: Vec<TimelineEventResponse>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UpdateConfigResponse {
    pub config: ConfigResponse,
    /// One entry per reconciled collection.
    pub results: Vec<ReconcileResponse>,
}

pub fn validate_update_config(payload: &UpdateConfigRequest) -> Result<(), crate::error::AppError> {
    if let Some(title) = &payload.title {
        validate_title(title)?;
    }
    Ok(())
}
