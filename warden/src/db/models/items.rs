//! Database models for items.

use crate::types::{ItemId, UserId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ItemCreateDBRequest {
    pub title: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Default)]
pub struct ItemUpdateDBRequest {
    pub title: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemDBResponse {
    pub id: ItemId,
    pub title: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
