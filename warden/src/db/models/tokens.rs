//! Database models for stored token pairs.

use crate::types::{TokenId, UserId};
use chrono::{DateTime, Utc};

/// Insert-or-replace request for the single token row a user may hold
#[derive(Debug, Clone)]
pub struct TokenUpsertDBRequest {
    pub user_id: UserId,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TokenDBResponse {
    pub id: TokenId,
    pub user_id: UserId,
    pub access_token: Option<String>,
    pub refresh_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
