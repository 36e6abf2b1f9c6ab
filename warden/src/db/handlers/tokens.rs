//! Postgres repository for stored token pairs.

use crate::db::{
    errors::Result,
    handlers::repository::TokenRepository,
    models::tokens::{TokenDBResponse, TokenUpsertDBRequest},
};
use crate::types::{UserId, abbrev_uuid};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

pub struct Tokens {
    db: PgPool,
}

impl Tokens {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl TokenRepository for Tokens {
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id)), err)]
    async fn upsert(&self, request: &TokenUpsertDBRequest) -> Result<TokenDBResponse> {
        let token = sqlx::query_as::<_, TokenDBResponse>(
            r#"
            INSERT INTO tokens (id, user_id, access_token, refresh_token)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.access_token)
        .bind(&request.refresh_token)
        .fetch_one(&self.db)
        .await?;

        Ok(token)
    }

    #[instrument(skip_all, err)]
    async fn get_by_refresh_token(&self, refresh_token: &str) -> Result<Option<TokenDBResponse>> {
        let token = sqlx::query_as::<_, TokenDBResponse>("SELECT * FROM tokens WHERE refresh_token = $1")
            .bind(refresh_token)
            .fetch_optional(&self.db)
            .await?;

        Ok(token)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    async fn get_by_user(&self, user_id: UserId) -> Result<Option<TokenDBResponse>> {
        let token = sqlx::query_as::<_, TokenDBResponse>("SELECT * FROM tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(token)
    }

    #[instrument(skip_all, err)]
    async fn delete_by_refresh_token(&self, refresh_token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tokens WHERE refresh_token = $1")
            .bind(refresh_token)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
