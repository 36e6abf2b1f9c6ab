//! In-memory repositories.
//!
//! Used for `database.type: memory` and by the HTTP test suite. They enforce the same unique
//! constraints as the Postgres schema and report violations under the same constraint names, so
//! handlers cannot tell the two apart. Locks are never held across an await.
//!
//! The token and item stores handed out by [`InMemoryUsers::tokens`] and [`InMemoryUsers::items`]
//! share the user map the way the Postgres tables share foreign keys: deleting a user removes
//! their token pair and items under the same locks, and an item cannot be created for a user who
//! does not exist. Locks are always taken in the order users, tokens, items.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{ItemFilter, ItemRepository, TokenRepository, UserFilter, UserRepository},
    models::{
        items::{ItemCreateDBRequest, ItemDBResponse, ItemUpdateDBRequest},
        tokens::{TokenDBResponse, TokenUpsertDBRequest},
        users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
};
use crate::types::{ItemId, UserId};

fn page<T>(rows: Vec<T>, skip: i64, limit: i64) -> Vec<T> {
    rows.into_iter()
        .skip(usize::try_from(skip).unwrap_or(0))
        .take(usize::try_from(limit).unwrap_or(0))
        .collect()
}

type UserRows = Arc<RwLock<HashMap<UserId, UserDBResponse>>>;

#[derive(Clone)]
pub struct InMemoryUsers {
    rows: UserRows,
    tokens: InMemoryTokens,
    items: InMemoryItems,
}

impl Default for InMemoryUsers {
    fn default() -> Self {
        let rows = UserRows::default();
        Self {
            tokens: InMemoryTokens::default(),
            items: InMemoryItems {
                rows: Arc::default(),
                owners: Some(rows.clone()),
            },
            rows,
        }
    }
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token store whose rows go away with their user
    pub fn tokens(&self) -> InMemoryTokens {
        self.tokens.clone()
    }

    /// Item store whose rows go away with their owner, and which only accepts existing owners
    pub fn items(&self) -> InMemoryItems {
        self.items.clone()
    }

    fn check_unique(rows: &HashMap<UserId, UserDBResponse>, id: Option<UserId>, username: Option<&str>, email: Option<&str>) -> Result<()> {
        for row in rows.values().filter(|row| Some(row.id) != id) {
            if username.is_some_and(|u| u == row.username) {
                return Err(DbError::unique("users", "users_username_key"));
            }
            if email.is_some_and(|e| e == row.email) {
                return Err(DbError::unique("users", "users_email_key"));
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUsers {
    async fn create(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let mut rows = self.rows.write();
        Self::check_unique(&rows, None, Some(&request.username), Some(&request.email))?;

        let now = Utc::now();
        let user = UserDBResponse {
            id: Uuid::new_v4(),
            username: request.username.clone(),
            email: request.email.clone(),
            password_hash: request.password_hash.clone(),
            role: request.role,
            verified: request.verified,
            first_name: None,
            last_name: None,
            birth_date: None,
            photo: None,
            created_at: now,
            updated_at: now,
        };
        rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        Ok(self.rows.read().get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<UserDBResponse>> {
        Ok(self.rows.read().values().find(|u| u.username == username).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        Ok(self.rows.read().values().find(|u| u.email == email).cloned())
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<UserDBResponse>> {
        let mut users: Vec<_> = self.rows.read().values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(page(users, filter.skip, filter.limit))
    }

    async fn update(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse> {
        let mut rows = self.rows.write();
        Self::check_unique(&rows, Some(id), request.username.as_deref(), request.email.as_deref())?;

        let user = rows.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(username) = &request.username {
            user.username = username.clone();
        }
        if let Some(email) = &request.email {
            user.email = email.clone();
        }
        if let Some(password_hash) = &request.password_hash {
            user.password_hash = password_hash.clone();
        }
        if let Some(role) = request.role {
            user.role = role;
        }
        if let Some(verified) = request.verified {
            user.verified = verified;
        }
        if let Some(first_name) = &request.first_name {
            user.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &request.last_name {
            user.last_name = Some(last_name.clone());
        }
        if let Some(birth_date) = request.birth_date {
            user.birth_date = Some(birth_date);
        }
        if let Some(photo) = &request.photo {
            user.photo = Some(photo.clone());
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn delete(&self, id: UserId) -> Result<bool> {
        let mut users = self.rows.write();
        let mut tokens = self.tokens.rows.write();
        let mut items = self.items.rows.write();

        if users.remove(&id).is_none() {
            return Ok(false);
        }
        tokens.remove(&id);
        items.retain(|_, item| item.user_id != id);
        Ok(true)
    }
}

/// Keyed by user ID, which gives the one-pair-per-user rule for free.
#[derive(Clone, Default)]
pub struct InMemoryTokens {
    rows: Arc<RwLock<HashMap<UserId, TokenDBResponse>>>,
}

impl InMemoryTokens {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TokenRepository for InMemoryTokens {
    async fn upsert(&self, request: &TokenUpsertDBRequest) -> Result<TokenDBResponse> {
        let now = Utc::now();
        let mut rows = self.rows.write();
        let token = rows
            .entry(request.user_id)
            .and_modify(|row| {
                row.access_token = Some(request.access_token.clone());
                row.refresh_token = request.refresh_token.clone();
                row.updated_at = now;
            })
            .or_insert_with(|| TokenDBResponse {
                id: Uuid::new_v4(),
                user_id: request.user_id,
                access_token: Some(request.access_token.clone()),
                refresh_token: request.refresh_token.clone(),
                created_at: now,
                updated_at: now,
            });
        Ok(token.clone())
    }

    async fn get_by_refresh_token(&self, refresh_token: &str) -> Result<Option<TokenDBResponse>> {
        Ok(self.rows.read().values().find(|t| t.refresh_token == refresh_token).cloned())
    }

    async fn get_by_user(&self, user_id: UserId) -> Result<Option<TokenDBResponse>> {
        Ok(self.rows.read().get(&user_id).cloned())
    }

    async fn delete_by_refresh_token(&self, refresh_token: &str) -> Result<bool> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|_, t| t.refresh_token != refresh_token);
        Ok(rows.len() < before)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryItems {
    rows: Arc<RwLock<HashMap<ItemId, ItemDBResponse>>>,
    /// Set when linked to a user store; owners are then checked on create
    owners: Option<UserRows>,
}

impl InMemoryItems {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ItemRepository for InMemoryItems {
    async fn create(&self, request: &ItemCreateDBRequest) -> Result<ItemDBResponse> {
        // Held until the insert so the owner cannot be deleted in between
        let owners = self.owners.as_ref().map(|owners| owners.read());
        if owners.as_ref().is_some_and(|owners| !owners.contains_key(&request.user_id)) {
            return Err(DbError::ForeignKeyViolation {
                constraint: Some("items_user_id_fkey".to_string()),
                table: Some("items".to_string()),
                message: format!("owner {} does not exist", request.user_id),
            });
        }

        let now = Utc::now();
        let item = ItemDBResponse {
            id: Uuid::new_v4(),
            title: request.title.clone(),
            user_id: request.user_id,
            created_at: now,
            updated_at: now,
        };
        self.rows.write().insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_by_id(&self, id: ItemId) -> Result<Option<ItemDBResponse>> {
        Ok(self.rows.read().get(&id).cloned())
    }

    async fn list(&self, filter: &ItemFilter) -> Result<Vec<ItemDBResponse>> {
        let mut items: Vec<_> = self
            .rows
            .read()
            .values()
            .filter(|i| i.user_id == filter.user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(page(items, filter.skip, filter.limit))
    }

    async fn update(&self, id: ItemId, request: &ItemUpdateDBRequest) -> Result<ItemDBResponse> {
        let mut rows = self.rows.write();
        let item = rows.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(title) = &request.title {
            item.title = title.clone();
        }
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn delete(&self, id: ItemId) -> Result<bool> {
        Ok(self.rows.write().remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;

    fn create_request(username: &str, email: &str) -> UserCreateDBRequest {
        UserCreateDBRequest {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Basic,
            verified: false,
        }
    }

    fn constraint_of(err: DbError) -> Option<String> {
        match err {
            DbError::UniqueViolation { constraint, .. } => constraint,
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_users_enforce_unique_username_and_email() {
        let users = InMemoryUsers::new();
        let first = users.create(&create_request("alice", "alice@example.com")).await.unwrap();

        let err = users.create(&create_request("alice", "other@example.com")).await.unwrap_err();
        assert_eq!(constraint_of(err).as_deref(), Some("users_username_key"));

        let err = users.create(&create_request("bob", "alice@example.com")).await.unwrap_err();
        assert_eq!(constraint_of(err).as_deref(), Some("users_email_key"));

        // Renaming onto yourself is fine, onto someone else is not
        let bob = users.create(&create_request("bob", "bob@example.com")).await.unwrap();
        let rename_self = UserUpdateDBRequest {
            username: Some("alice".to_string()),
            ..Default::default()
        };
        assert!(users.update(first.id, &rename_self).await.is_ok());
        let err = users.update(bob.id, &rename_self).await.unwrap_err();
        assert_eq!(constraint_of(err).as_deref(), Some("users_username_key"));
    }

    #[tokio::test]
    async fn test_users_update_missing_is_not_found() {
        let users = InMemoryUsers::new();
        let result = users.update(Uuid::new_v4(), &UserUpdateDBRequest::default()).await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }

    #[tokio::test]
    async fn test_users_list_paginates() {
        let users = InMemoryUsers::new();
        for i in 0..5 {
            users
                .create(&create_request(&format!("user{i}"), &format!("user{i}@example.com")))
                .await
                .unwrap();
        }

        assert_eq!(users.list(&UserFilter::new(0, 2)).await.unwrap().len(), 2);
        assert_eq!(users.list(&UserFilter::new(4, 10)).await.unwrap().len(), 1);
        assert!(users.list(&UserFilter::new(10, 10)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tokens_one_row_per_user() {
        let tokens = InMemoryTokens::new();
        let user_id = Uuid::new_v4();

        let first = tokens
            .upsert(&TokenUpsertDBRequest {
                user_id,
                access_token: "a1".to_string(),
                refresh_token: "r1".to_string(),
            })
            .await
            .unwrap();
        let second = tokens
            .upsert(&TokenUpsertDBRequest {
                user_id,
                access_token: "a2".to_string(),
                refresh_token: "r2".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(tokens.get_by_refresh_token("r1").await.unwrap().is_none());
        assert_eq!(tokens.get_by_refresh_token("r2").await.unwrap().unwrap().user_id, user_id);

        assert!(tokens.delete_by_refresh_token("r2").await.unwrap());
        assert!(!tokens.delete_by_refresh_token("r2").await.unwrap());
        assert!(tokens.get_by_user(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_items_scoped_to_owner() {
        let items = InMemoryItems::new();
        let (owner, other) = (Uuid::new_v4(), Uuid::new_v4());

        for (title, user_id) in [("one", owner), ("two", owner), ("three", other)] {
            items
                .create(&ItemCreateDBRequest {
                    title: title.to_string(),
                    user_id,
                })
                .await
                .unwrap();
        }

        let mine = items.list(&ItemFilter::new(owner, 0, 100)).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|i| i.user_id == owner));
        assert_eq!(items.list(&ItemFilter::new(other, 0, 100)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_delete_cascades_to_token_and_items() {
        let users = InMemoryUsers::new();
        let (tokens, items) = (users.tokens(), users.items());
        let leaving = users.create(&create_request("leaving", "leaving@example.com")).await.unwrap();
        let staying = users.create(&create_request("staying", "staying@example.com")).await.unwrap();

        tokens
            .upsert(&TokenUpsertDBRequest {
                user_id: leaving.id,
                access_token: "a".to_string(),
                refresh_token: "r".to_string(),
            })
            .await
            .unwrap();
        for user_id in [leaving.id, leaving.id, staying.id] {
            items
                .create(&ItemCreateDBRequest {
                    title: "Chores".to_string(),
                    user_id,
                })
                .await
                .unwrap();
        }

        assert!(users.delete(leaving.id).await.unwrap());
        assert!(!users.delete(leaving.id).await.unwrap());

        assert!(tokens.get_by_user(leaving.id).await.unwrap().is_none());
        assert!(items.list(&ItemFilter::new(leaving.id, 0, 100)).await.unwrap().is_empty());
        assert_eq!(items.list(&ItemFilter::new(staying.id, 0, 100)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_linked_items_reject_unknown_owner() {
        let users = InMemoryUsers::new();
        let items = users.items();

        let err = items
            .create(&ItemCreateDBRequest {
                title: "Orphan".to_string(),
                user_id: Uuid::new_v4(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
