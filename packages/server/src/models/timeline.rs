use chrono::{DateTime, NaiveDate, Utc};
use common::reconcile::{Identity, Intent, PersistedRecord, Reconcilable, WireId, resolve_identity};
use common::storage::BlobKey;
use serde::{Deserialize, Serialize};

use super::shared::{
    blob_refs, check_blob_key, check_optional_text, check_text, check_url, double_option,
    patch_matches, require,
};
use crate::entity::timeline_event;

/// One milestone of a submitted timeline. List order is display order.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct TimelineInput {
    /// Stored id, or a `temp-` placeholder for an event not saved yet.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "temp-1712345")]
    pub id: Option<WireId<i32>>,
    #[schema(example = "First date")]
    pub title: Option<String>,
    /// Calendar date, `YYYY-MM-DD`.
    #[schema(example = "2021-06-14")]
    pub occurred_on: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub blob_key: Option<Option<String>>,
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("occurred_on '{raw}' is not a YYYY-MM-DD date"))
}

impl Reconcilable for TimelineInput {
    type Key = i32;
    type Row = timeline_event::Model;

    fn identity(&self) -> Identity<i32> {
        resolve_identity(self.id.as_ref()).unwrap_or_default()
    }

    fn validate(&self, intent: Intent) -> Result<(), String> {
        resolve_identity(self.id.as_ref())?;
        if intent == Intent::Create {
            require("title", &self.title)?;
            require("occurred_on", &self.occurred_on)?;
        }
        if let Some(title) = &self.title {
            check_text("title", title, 256)?;
        }
        if let Some(date) = &self.occurred_on {
            parse_date(date)?;
        }
        check_optional_text("description", &self.description, 4000)?;
        if let Some(Some(url)) = &self.image_url {
            check_url("image_url", url)?;
        }
        check_blob_key(&self.blob_key)
    }

    fn blob_refs(&self) -> Vec<BlobKey> {
        blob_refs(self.blob_key.as_ref().and_then(|k| k.as_deref()))
    }

    fn is_reflected_in(&self, row: &timeline_event::Model) -> bool {
        self.title.as_ref().is_none_or(|t| t.trim() == row.title)
            && self
                .occurred_on
                .as_ref()
                .is_none_or(|d| parse_date(d) == Ok(row.occurred_on))
            && patch_matches(&self.description, &row.description)
            && patch_matches(&self.image_url, &row.image_url)
            && patch_matches(&self.blob_key, &row.blob_key)
    }
}

impl PersistedRecord for timeline_event::Model {
    type Key = i32;

    fn key(&self) -> i32 {
        self.id
    }

    fn ordinal(&self) -> Option<i32> {
        Some(self.position)
    }

    fn blob_refs(&self) -> Vec<BlobKey> {
        blob_refs(self.blob_key.as_deref())
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct TimelineRequest {
    /// The complete desired timeline, in display order.
    pub items: Vec<TimelineInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TimelineEventResponse {
    pub id: i32,
    pub title: String,
    #[schema(value_type = String, example = "2021-06-14")]
    pub occurred_on: NaiveDate,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub blob_key: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<timeline_event::Model> for TimelineEventResponse {
    fn from(m: timeline_event::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            occurred_on: m.occurred_on,
            description: m.description,
            image_url: m.image_url,
            blob_key: m.blob_key,
            position: m.position,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
