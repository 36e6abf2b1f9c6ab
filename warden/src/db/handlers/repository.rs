//! Repository traits for the three stores.
//!
//! Each trait is object safe so the application state can hold an `Arc<dyn ...>` and pick the
//! Postgres or in-memory implementation at startup. Implementations report constraint failures
//! as [`DbError::UniqueViolation`](crate::db::errors::DbError::UniqueViolation) carrying the
//! same constraint names the migrations declare, and an item whose owner is gone as
//! [`DbError::ForeignKeyViolation`](crate::db::errors::DbError::ForeignKeyViolation).

use crate::db::errors::Result;
use crate::db::models::{
    items::{ItemCreateDBRequest, ItemDBResponse, ItemUpdateDBRequest},
    tokens::{TokenDBResponse, TokenUpsertDBRequest},
    users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
};
use crate::types::{ItemId, UserId};

/// Filter for listing users
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: i64,
}

impl UserFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

/// Filter for listing one user's items
#[derive(Debug, Clone)]
pub struct ItemFilter {
    pub user_id: UserId,
    pub skip: i64,
    pub limit: i64,
}

impl ItemFilter {
    pub fn new(user_id: UserId, skip: i64, limit: i64) -> Self {
        Self { user_id, skip, limit }
    }
}

/// Credential store
#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user with a fresh ID
    async fn create(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse>;

    async fn get_by_id(&self, id: UserId) -> Result<Option<UserDBResponse>>;

    /// Exact match on username
    async fn get_by_username(&self, username: &str) -> Result<Option<UserDBResponse>>;

    /// Exact match on the stored (already lowercased) email
    async fn get_by_email(&self, email: &str) -> Result<Option<UserDBResponse>>;

    /// Newest first
    async fn list(&self, filter: &UserFilter) -> Result<Vec<UserDBResponse>>;

    /// Apply the `Some` fields of `request`. Fails with `DbError::NotFound` for an unknown ID.
    async fn update(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse>;

    /// Remove the user together with their token pair and items, all or nothing. Returns whether
    /// the user existed.
    async fn delete(&self, id: UserId) -> Result<bool>;
}

/// Session/token store. Holds at most one row per user.
#[async_trait::async_trait]
pub trait TokenRepository: Send + Sync {
    /// Insert the user's token pair, replacing any existing one
    async fn upsert(&self, request: &TokenUpsertDBRequest) -> Result<TokenDBResponse>;

    async fn get_by_refresh_token(&self, refresh_token: &str) -> Result<Option<TokenDBResponse>>;

    async fn get_by_user(&self, user_id: UserId) -> Result<Option<TokenDBResponse>>;

    async fn delete_by_refresh_token(&self, refresh_token: &str) -> Result<bool>;
}

/// Resource store
#[async_trait::async_trait]
pub trait ItemRepository: Send + Sync {
    async fn create(&self, request: &ItemCreateDBRequest) -> Result<ItemDBResponse>;

    async fn get_by_id(&self, id: ItemId) -> Result<Option<ItemDBResponse>>;

    /// Items owned by `filter.user_id`, oldest first
    async fn list(&self, filter: &ItemFilter) -> Result<Vec<ItemDBResponse>>;

    /// Fails with `DbError::NotFound` for an unknown ID
    async fn update(&self, id: ItemId, request: &ItemUpdateDBRequest) -> Result<ItemDBResponse>;

    async fn delete(&self, id: ItemId) -> Result<bool>;
}
