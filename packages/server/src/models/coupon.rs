use chrono::{DateTime, Utc};
use common::reconcile::{Identity, Intent, PersistedRecord, Reconcilable, WireId, resolve_identity};
use serde::{Deserialize, Serialize};

use super::shared::{check_optional_text, check_text, double_option, patch_matches, require};
use crate::entity::coupon;

/// One coupon of a submitted coupon collection.
///
/// On update every field is optional; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct CouponInput {
    /// Stored id, or a `temp-` placeholder for a coupon not saved yet.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "temp-1712345")]
    pub id: Option<WireId<i32>>,
    #[schema(example = "Breakfast in bed")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, example = "🥞")]
    pub emoji: Option<Option<String>>,
    pub redeemed: Option<bool>,
}

impl Reconcilable for CouponInput {
    type Key = i32;
    type Row = coupon::Model;

    fn identity(&self) -> Identity<i32> {
        resolve_identity(self.id.as_ref()).unwrap_or_default()
    }

    fn validate(&self, intent: Intent) -> Result<(), String> {
        resolve_identity(self.id.as_ref())?;
        if intent == Intent::Create {
            require("title", &self.title)?;
        }
        if let Some(title) = &self.title {
            check_text("title", title, 256)?;
        }
        check_optional_text("description", &self.description, 2000)?;
        check_optional_text("emoji", &self.emoji, 16)?;
        Ok(())
    }

    fn is_reflected_in(&self, row: &coupon::Model) -> bool {
        self.title.as_ref().is_none_or(|t| t.trim() == row.title)
            && patch_matches(&self.description, &row.description)
            && patch_matches(&self.emoji, &row.emoji)
            && self.redeemed.is_none_or(|r| r == row.redeemed)
    }
}

impl PersistedRecord for coupon::Model {
    type Key = i32;

    fn key(&self) -> i32 {
        self.id
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CouponsRequest {
    /// The complete desired collection.
    pub items: Vec<CouponInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CouponResponse {
    #[schema(example = 12)]
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub redeemed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<coupon::Model> for CouponResponse {
    fn from(m: coupon::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            emoji: m.emoji,
            redeemed: m.redeemed,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
