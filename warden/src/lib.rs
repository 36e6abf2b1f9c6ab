//! # warden: accounts, role-based access control and owned items
//!
//! `warden` is a JSON HTTP service for user accounts, short-lived bearer access tokens backed by a
//! refresh token in a signed cookie, and CRUD over items that belong to users.
//!
//! ## Architecture
//!
//! - **Web framework**: [Axum](https://github.com/tokio-rs/axum) handlers in [`api::handlers`]
//! - **Persistence**: repository traits in [`db::handlers`], implemented over PostgreSQL with
//!   [SQLx](https://github.com/launchbadge/sqlx) or over in-process maps ([`db::memory`])
//! - **Authentication**: HS256 JWT access/refresh tokens ([`auth::tokens`]), HMAC-signed refresh
//!   cookie ([`auth::cookies`]) and Argon2 password hashes ([`auth::password`])
//! - **Authorization**: a total order over roles, evaluated in [`auth::policy`]
//!
//! Roles, from least to most privileged: `basic`, `admin`, `superuser`. Users may act on their own
//! account and items; administrators may also act on basic users' accounts and items;
//! superusers may act on anything and are the only ones who can change roles.
//!
//! ## Getting started
//!
//! ```no_run
//! use warden::{Application, config::Config};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let app = Application::new(config).await?;
//! app.serve(async { tokio::signal::ctrl_c().await.ok(); }).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Configuration is described in [`config`].

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod test_utils;

use crate::{
    api::{
        handlers::{auth as auth_handlers, items, user, users},
        models::users::Role,
    },
    auth::{
        password::{self, Argon2Params},
        utils::normalize_email,
    },
    config::{Config, CorsOrigin, DatabaseConfig, PoolSettings},
    db::{
        handlers::{ItemRepository, Items, TokenRepository, Tokens, UserRepository, Users},
        memory::InMemoryUsers,
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    openapi::ApiDoc,
    types::UserId,
};
use anyhow::Context;
use axum::{
    Json, Router,
    http::{self, HeaderValue},
    routing::{delete, get, post},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// The repositories are trait objects so the same handlers run against PostgreSQL in production
/// and the in-memory store in tests or `type: memory` deployments.
///
/// ```ignore
/// let users = InMemoryUsers::new();
/// let state = AppState::builder()
///     .config(config)
///     .tokens(Arc::new(users.tokens()))
///     .items(Arc::new(users.items()))
///     .users(Arc::new(users))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub items: Arc<dyn ItemRepository>,
}

/// Get the warden database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Ensure the configured superuser exists.
///
/// Does nothing unless both `admin_email` and `admin_password` are set. An existing account with
/// that email is promoted to superuser and gets the configured password; otherwise a verified
/// superuser is created with `admin_username`.
///
/// Returns the id of the superuser, if one was configured.
#[instrument(skip_all, err)]
pub async fn create_initial_admin_user(state: &AppState) -> anyhow::Result<Option<UserId>> {
    let (Some(email), Some(admin_password)) = (&state.config.admin_email, &state.config.admin_password) else {
        return Ok(None);
    };
    let email = normalize_email(email);

    let password_hash = password::hash_blocking(admin_password.clone(), Argon2Params::from(&state.config.auth.password))
        .await
        .context("Failed to hash admin password")?;

    if let Some(existing) = state.users.get_by_email(&email).await? {
        let update = UserUpdateDBRequest {
            password_hash: Some(password_hash),
            role: Some(Role::Superuser),
            verified: Some(true),
            ..Default::default()
        };
        state.users.update(existing.id, &update).await?;
        info!("Promoted existing user {} to superuser", existing.id);
        return Ok(Some(existing.id));
    }

    let created = state
        .users
        .create(&UserCreateDBRequest {
            username: state.config.admin_username.clone(),
            email,
            password_hash,
            role: Role::Superuser,
            verified: true,
        })
        .await
        .context("Failed to create admin user")?;

    info!("Created superuser {} ({})", created.username, created.id);
    Ok(Some(created.id))
}

async fn connect_postgres(url: &str, pool: &PoolSettings) -> anyhow::Result<PgPool> {
    let mut options = PgPoolOptions::new()
        .max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .acquire_timeout(Duration::from_secs(pool.acquire_timeout_secs));

    if pool.idle_timeout_secs > 0 {
        options = options.idle_timeout(Duration::from_secs(pool.idle_timeout_secs));
    }
    if pool.max_lifetime_secs > 0 {
        options = options.max_lifetime(Duration::from_secs(pool.max_lifetime_secs));
    }

    let db = options.connect(url).await.context("Failed to connect to PostgreSQL")?;
    migrator().run(&db).await.context("Failed to run migrations")?;
    Ok(db)
}

/// Build the application state for the configured backend.
///
/// Returns the pool alongside the state when PostgreSQL is used, so it can be closed on shutdown.
async fn setup_state(config: &Config) -> anyhow::Result<(AppState, Option<PgPool>)> {
    match &config.database {
        DatabaseConfig::Memory => {
            info!("Using the in-memory store; data is lost on shutdown");
            let users = InMemoryUsers::new();
            let state = AppState::builder()
                .config(config.clone())
                .tokens(Arc::new(users.tokens()))
                .items(Arc::new(users.items()))
                .users(Arc::new(users))
                .build();
            Ok((state, None))
        }
        DatabaseConfig::Postgres { url, pool } => {
            let db = connect_postgres(url, pool).await?;
            let state = AppState::builder()
                .config(config.clone())
                .users(Arc::new(Users::new(db.clone())))
                .tokens(Arc::new(Tokens::new(db.clone())))
                .items(Arc::new(Items::new(db.clone())))
                .build();
            Ok((state, Some(db)))
        }
    }
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allowed = &config.auth.security.cors.allowed_origins;
    let allow_origin = if allowed.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in allowed {
            if let CorsOrigin::Url(url) = origin {
                // Browsers send origins without a trailing slash
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PATCH, http::Method::DELETE])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(config.auth.security.cors.allow_credentials);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route("/auth/signup", post(auth_handlers::signup))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/refresh", post(auth_handlers::refresh))
        .route("/auth/logout", delete(auth_handlers::logout))
        .route(
            "/user",
            get(user::get_current_user)
                .patch(user::update_current_user)
                .delete(user::delete_current_user),
        )
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user).patch(users::update_user).delete(users::delete_user),
        )
        .route("/items", post(items::create_item).get(items::list_items))
        .route("/items/all", get(items::list_items))
        .route("/items/all/{user_id}", get(items::list_user_items))
        .route(
            "/items/{id}",
            get(items::get_item).patch(items::update_item).delete(items::delete_item),
        )
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .merge(api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(create_cors_layer(&state.config)?),
        );

    Ok(router)
}

/// A configured server: state, router and the database pool backing them.
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting warden with configuration: {:#?}", config);

        let (state, pool) = setup_state(&config).await?;
        create_initial_admin_user(&state).await?;
        let router = build_router(&state)?;

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "warden listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        Ok(())
    }
}
