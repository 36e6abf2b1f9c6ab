//! API request/response models for items.

use crate::db::models::items::ItemDBResponse;
use crate::errors::Error;
use crate::types::{ItemId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const TITLE_MAX_LENGTH: usize = 20;

/// Trimmed title, 1 to [`TITLE_MAX_LENGTH`] characters.
pub fn validate_title(title: Option<&str>) -> Result<String, Error> {
    let title = title.map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(Error::InvalidField {
            field: "title",
            message: "Please enter a title".to_string(),
        });
    }
    if title.chars().count() > TITLE_MAX_LENGTH {
        return Err(Error::InvalidField {
            field: "title",
            message: format!("Title must be at most {TITLE_MAX_LENGTH} characters long"),
        });
    }
    Ok(title.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemCreate {
    /// 1 to 20 characters
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ItemUpdate {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ItemId,
    pub title: String,
    /// Owner of the item
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ItemDBResponse> for ItemResponse {
    fn from(db: ItemDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            user_id: db.user_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
