//! Test utilities shared by unit and HTTP tests.

use crate::{
    AppState,
    api::models::users::{CurrentUser, Role},
    auth::{
        password::{self, Argon2Params},
        tokens::{self, TokenKind},
    },
    config::{Config, SecretsConfig},
    db::{
        memory::InMemoryUsers,
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
};
use axum::http::header;
use axum_test::{TestResponse, TestServer};
use std::sync::Arc;
use uuid::Uuid;

/// Password every user from [`create_test_user`] is created with
pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        secrets: SecretsConfig {
            access_token_secret: Some("test-access-secret".to_string()),
            refresh_token_secret: Some("test-refresh-secret".to_string()),
            cookie_secret: Some("test-cookie-secret".to_string()),
        },
        ..Default::default()
    };

    // Cheap hashing keeps the HTTP tests fast
    config.auth.password.argon2_memory_kib = 8;
    config.auth.password.argon2_iterations = 1;
    config.auth.password.argon2_parallelism = 1;
    config.auth.refresh_cookie.cookie_secure = false;
    config
}

pub fn create_test_state_with_config(config: Config) -> AppState {
    let users = InMemoryUsers::new();
    AppState::builder()
        .config(config)
        .tokens(Arc::new(users.tokens()))
        .items(Arc::new(users.items()))
        .users(Arc::new(users))
        .build()
}

pub fn create_test_state() -> AppState {
    create_test_state_with_config(create_test_config())
}

pub fn create_test_server(state: &AppState) -> TestServer {
    let router = crate::build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// Insert a user directly into the store, with [`TEST_PASSWORD`] as password.
pub async fn create_test_user(state: &AppState, role: Role) -> UserDBResponse {
    let username = format!("testuser_{}", Uuid::new_v4().simple());
    let password_hash = password::hash_string_with_params(TEST_PASSWORD, Argon2Params::from(&state.config.auth.password))
        .expect("Failed to hash test password");

    state
        .users
        .create(&UserCreateDBRequest {
            email: format!("{username}@example.com"),
            username,
            password_hash,
            role,
            verified: false,
        })
        .await
        .expect("Failed to create test user")
}

/// `Authorization` header value for a user, minted without going through login.
pub fn bearer_for(state: &AppState, user: &UserDBResponse) -> String {
    let token = tokens::create_token(&CurrentUser::from(user), TokenKind::Access, &state.config).expect("Failed to create access token");
    format!("Bearer {token}")
}

/// The `name=value` part of a response's `Set-Cookie` header, ready to send back as `Cookie`.
pub fn cookie_from(response: &TestResponse) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Response has no Set-Cookie header")
        .to_str()
        .expect("Set-Cookie is not ASCII");
    set_cookie.split(';').next().unwrap_or_default().to_string()
}

/// Log in through the API, returning the access token and the refresh cookie.
pub async fn login(server: &TestServer, username: &str, password: &str) -> (String, String) {
    let response = server
        .post("/auth/login")
        .json(&serde_json::json!({ "username": username, "password": password }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let access_token = body["accessToken"].as_str().expect("No accessToken in body").to_string();
    (access_token, cookie_from(&response))
}
