//! Postgres repository for items.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::{ItemFilter, ItemRepository},
    models::items::{ItemCreateDBRequest, ItemDBResponse, ItemUpdateDBRequest},
};
use crate::types::{ItemId, abbrev_uuid};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

pub struct Items {
    db: PgPool,
}

impl Items {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl ItemRepository for Items {
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id)), err)]
    async fn create(&self, request: &ItemCreateDBRequest) -> Result<ItemDBResponse> {
        let item = sqlx::query_as::<_, ItemDBResponse>(
            r#"
            INSERT INTO items (id, title, user_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.title)
        .bind(request.user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(item)
    }

    #[instrument(skip(self), fields(item_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&self, id: ItemId) -> Result<Option<ItemDBResponse>> {
        let item = sqlx::query_as::<_, ItemDBResponse>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(item)
    }

    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id), limit = filter.limit, skip = filter.skip), err)]
    async fn list(&self, filter: &ItemFilter) -> Result<Vec<ItemDBResponse>> {
        let items = sqlx::query_as::<_, ItemDBResponse>(
            "SELECT * FROM items WHERE user_id = $1 ORDER BY created_at ASC, id LIMIT $2 OFFSET $3",
        )
        .bind(filter.user_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    #[instrument(skip(self, request), fields(item_id = %abbrev_uuid(&id)), err)]
    async fn update(&self, id: ItemId, request: &ItemUpdateDBRequest) -> Result<ItemDBResponse> {
        let item = sqlx::query_as::<_, ItemDBResponse>(
            r#"
            UPDATE items SET
                title = COALESCE($2, title),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(item)
    }

    #[instrument(skip(self), fields(item_id = %abbrev_uuid(&id)), err)]
    async fn delete(&self, id: ItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1").bind(id).execute(&self.db).await?;

        Ok(result.rows_affected() > 0)
    }
}
