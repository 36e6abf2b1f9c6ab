use axum::{Json, extract::State, http::HeaderMap, http::StatusCode};
use tracing::{debug, info};

use crate::{
    AppState,
    api::models::{
        auth::{AccessTokenResponse, LoginRequest, LogoutResponse, SignupRequest, SuccessResponse, TokenResponse},
        users::{CurrentUser, Role, check_email, check_username},
    },
    auth::{
        cookies::{self, SignedCookie},
        password::{self, Argon2Params},
        tokens::{self, TokenKind},
        utils::{generate_username, normalize_email},
    },
    db::{
        errors::DbError,
        models::{tokens::TokenUpsertDBRequest, users::UserCreateDBRequest, users::UserDBResponse},
    },
    errors::{ERROR_KEY, Error, Result},
};

/// Attempts at finding a free generated username before giving up
const USERNAME_ATTEMPTS: usize = 5;

fn missing(field: &'static str, message: &str) -> Error {
    Error::InvalidField {
        field,
        message: message.to_string(),
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Issue a fresh token pair, store it and build the response carrying both.
async fn start_session(state: &AppState, user: &CurrentUser) -> Result<TokenResponse> {
    let pair = tokens::issue_pair(user, &state.config)?;

    state
        .tokens
        .upsert(&TokenUpsertDBRequest {
            user_id: user.id,
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
        })
        .await?;

    let cookie = cookies::refresh_cookie(&pair.refresh_token, &state.config)?;

    Ok(TokenResponse {
        body: AccessTokenResponse {
            access_token: pair.access_token,
        },
        cookie,
    })
}

async fn create_with_generated_username(state: &AppState, email: &str, password_hash: &str) -> Result<UserDBResponse> {
    for attempt in 1..=USERNAME_ATTEMPTS {
        let username = generate_username(email);
        if state.users.get_by_username(&username).await?.is_some() {
            debug!("Generated username {username} is taken (attempt {attempt})");
            continue;
        }

        let request = UserCreateDBRequest {
            username,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role: Role::Basic,
            verified: false,
        };
        match state.users.create(&request).await {
            Ok(user) => return Ok(user),
            Err(DbError::UniqueViolation { constraint, .. }) if constraint.as_deref() == Some("users_username_key") => {
                debug!("Generated username collided on insert (attempt {attempt})");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::Internal {
        operation: format!("generate a unique username after {USERNAME_ATTEMPTS} attempts"),
    })
}

/// Create a new account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    tag = "auth",
    responses(
        (status = 201, description = "Account created", body = SuccessResponse),
        (status = 400, description = "Invalid or duplicate field, keyed by field name"),
        (status = 500, description = "Internal server error"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn signup(State(state): State<AppState>, Json(request): Json<SignupRequest>) -> Result<(StatusCode, Json<SuccessResponse>)> {
    let auth = &state.config.auth;
    if !auth.allow_registration {
        return Err(Error::BadRequest {
            message: "Registration is disabled".to_string(),
        });
    }

    let password = present(request.password).ok_or_else(|| missing("password", "Please enter a password"))?;
    let password2 = present(request.password2).ok_or_else(|| missing("password2", "Please confirm your password"))?;
    if password != password2 {
        return Err(missing("password2", "Passwords do not match"));
    }

    let length = password.chars().count();
    if length < auth.password.min_length {
        return Err(Error::InvalidField {
            field: "password",
            message: format!("Password must be at least {} characters long", auth.password.min_length),
        });
    }
    if length > auth.password.max_length {
        return Err(Error::InvalidField {
            field: "password",
            message: format!("Password must be at most {} characters long", auth.password.max_length),
        });
    }

    let email = request
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| missing("email", "You must enter an email address"))?;
    check_email(&email)?;

    let username = request.username.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
    if let Some(username) = &username {
        check_username(username)?;
    }

    if state.users.get_by_email(&email).await?.is_some() {
        return Err(Error::Conflict {
            field: "email",
            message: "A user with this email already exists".to_string(),
        });
    }
    if let Some(username) = &username {
        if state.users.get_by_username(username).await?.is_some() {
            return Err(Error::Conflict {
                field: "username",
                message: "A user with this username already exists".to_string(),
            });
        }
    }

    let password_hash = password::hash_blocking(password, Argon2Params::from(&auth.password)).await?;

    let user = match username {
        Some(username) => {
            state
                .users
                .create(&UserCreateDBRequest {
                    username,
                    email,
                    password_hash,
                    role: Role::Basic,
                    verified: false,
                })
                .await?
        }
        None => create_with_generated_username(&state, &email, &password_hash).await?,
    };

    info!("Created account {} ({})", user.id, user.username);
    Ok((StatusCode::CREATED, Json(SuccessResponse::new("Your account has been created"))))
}

/// Log in with a username or email address
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Logged in; refresh token set as a cookie", body = AccessTokenResponse),
        (status = 400, description = "Missing username or password"),
        (status = 403, description = "Wrong password"),
        (status = 404, description = "No account with that username or email"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<TokenResponse> {
    let identity = request
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| missing("username", "Please enter a username or email"))?;
    let password = present(request.password).ok_or_else(|| missing("password", "Please enter a password"))?;

    let user = match state.users.get_by_username(&identity).await? {
        Some(user) => user,
        None => state
            .users
            .get_by_email(&normalize_email(&identity))
            .await?
            .ok_or_else(|| Error::UnknownIdentity {
                message: "User with specified username/email could not be found".to_string(),
            })?,
    };

    if !password::verify_blocking(password, user.password_hash.clone()).await? {
        return Err(Error::InvalidCredentials {
            field: "password",
            message: "Password entered is invalid".to_string(),
        });
    }

    let response = start_session(&state, &CurrentUser::from(&user)).await?;
    info!("User {} logged in", user.id);
    Ok(response)
}

/// Exchange the refresh cookie for a new token pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "New access token; refresh cookie rotated", body = AccessTokenResponse),
        (status = 401, description = "No refresh cookie"),
        (status = 403, description = "Refresh token rejected"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> Result<TokenResponse> {
    let rejected = |message: &str| Error::InvalidCredentials {
        field: ERROR_KEY,
        message: message.to_string(),
    };

    let token = match cookies::read_refresh_token(&headers, &state.config)? {
        SignedCookie::Missing => {
            return Err(Error::Unauthenticated {
                message: Some("No refresh token was received".to_string()),
            });
        }
        SignedCookie::Tampered => return Err(rejected("Refresh token signature is invalid")),
        SignedCookie::Valid(token) => token,
    };

    let stored = state
        .tokens
        .get_by_refresh_token(&token)
        .await?
        .ok_or_else(|| rejected("Refresh token is not recognised"))?;

    let claims = match tokens::verify_token(&token, TokenKind::Refresh, &state.config) {
        Ok(claims) => claims,
        Err(Error::Unauthenticated { .. }) => return Err(rejected("Refresh token is invalid or has expired")),
        Err(e) => return Err(e),
    };
    if claims.id != stored.user_id {
        return Err(rejected("Refresh token is not recognised"));
    }

    // Rebuild from the stored record so role changes since login take effect
    let user = state
        .users
        .get_by_id(stored.user_id)
        .await?
        .ok_or_else(|| rejected("The account for this refresh token no longer exists"))?;

    let response = start_session(&state, &CurrentUser::from(&user)).await?;
    debug!("Rotated tokens for user {}", user.id);
    Ok(response)
}

/// Revoke the refresh token and clear its cookie
#[utoipa::path(
    delete,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Logged out"),
        (status = 400, description = "No valid refresh token to revoke"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<LogoutResponse> {
    let unable = || Error::BadRequest {
        message: "Unable to log out".to_string(),
    };

    let SignedCookie::Valid(token) = cookies::read_refresh_token(&headers, &state.config)? else {
        return Err(unable());
    };

    if !state.tokens.delete_by_refresh_token(&token).await? {
        return Err(unable());
    }

    Ok(LogoutResponse {
        cookie: cookies::clear_refresh_cookie(&state.config),
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::users::Role,
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    fn signup_body(email: &str, password: &str, password2: &str) -> Value {
        json!({ "email": email, "password": password, "password2": password2 })
    }

    #[tokio::test]
    async fn test_signup_success_and_login() {
        let state = create_test_state();
        let server = create_test_server(&state);

        let response = server
            .post("/auth/signup")
            .json(&json!({
                "email": "Ada@Example.com",
                "username": "ada_l",
                "password": "password123",
                "password2": "password123",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.assert_json(&json!({ "success": "Your account has been created" }));

        let stored = state.users.get_by_username("ada_l").await.unwrap().unwrap();
        assert_eq!(stored.email, "ada@example.com");
        assert_eq!(stored.role, Role::Basic);
        assert_ne!(stored.password_hash, "password123");

        let (access_token, cookie) = login(&server, "ada@example.com", "password123").await;
        assert!(!access_token.is_empty());
        assert!(cookie.starts_with("refreshToken="));
    }

    #[tokio::test]
    async fn test_signup_generates_username() {
        let state = create_test_state();
        let server = create_test_server(&state);

        server
            .post("/auth/signup")
            .json(&signup_body("grace.hopper@example.com", "password123", "password123"))
            .await
            .assert_status(StatusCode::CREATED);

        let user = state.users.get_by_email("grace.hopper@example.com").await.unwrap().unwrap();
        assert!(user.username.starts_with("grace.hopper"));
        assert_eq!(user.username.len(), "grace.hopper".len() + 4);
    }

    #[tokio::test]
    async fn test_signup_validation_order() {
        let state = create_test_state();
        let server = create_test_server(&state);

        let cases = [
            (json!({ "email": "a@example.com", "password2": "password123" }), "password", "Please enter a password"),
            (json!({ "email": "a@example.com", "password": "password123" }), "password2", "Please confirm your password"),
            (signup_body("a@example.com", "password123", "password124"), "password2", "Passwords do not match"),
            (
                signup_body("a@example.com", "short", "short"),
                "password",
                "Password must be at least 8 characters long",
            ),
            (
                signup_body("a@example.com", &"x".repeat(129), &"x".repeat(129)),
                "password",
                "Password must be at most 128 characters long",
            ),
            (json!({ "password": "password123", "password2": "password123" }), "email", "You must enter an email address"),
            (signup_body("not-an-email", "password123", "password123"), "email", "Please enter a valid email address"),
            // Mismatch wins over a bad email
            (signup_body("not-an-email", "password123", "nope"), "password2", "Passwords do not match"),
        ];

        for (body, field, message) in cases {
            let response = server.post("/auth/signup").json(&body).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            let json: Value = response.json();
            assert_eq!(json[field], message, "body: {body}");
        }
    }

    #[tokio::test]
    async fn test_signup_rejects_bad_username() {
        let state = create_test_state();
        let server = create_test_server(&state);

        let response = server
            .post("/auth/signup")
            .json(&json!({
                "email": "a@example.com",
                "username": "no spaces",
                "password": "password123",
                "password2": "password123",
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let json: Value = response.json();
        assert!(json["username"].is_string());
    }

    #[tokio::test]
    async fn test_signup_duplicates() {
        let state = create_test_state();
        let server = create_test_server(&state);
        let existing = create_test_user(&state, Role::Basic).await;

        let response = server
            .post("/auth/signup")
            .json(&signup_body(&existing.email.to_uppercase(), "password123", "password123"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "email": "A user with this email already exists" }));

        let response = server
            .post("/auth/signup")
            .json(&json!({
                "email": "fresh@example.com",
                "username": existing.username,
                "password": "password123",
                "password2": "password123",
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "username": "A user with this username already exists" }));
    }

    #[tokio::test]
    async fn test_signup_disabled() {
        let mut config = create_test_config();
        config.auth.allow_registration = false;
        let state = create_test_state_with_config(config);
        let server = create_test_server(&state);

        let response = server
            .post("/auth/signup")
            .json(&signup_body("a@example.com", "password123", "password123"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let json: Value = response.json();
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_login_errors() {
        let state = create_test_state();
        let server = create_test_server(&state);
        let user = create_test_user(&state, Role::Basic).await;

        let response = server.post("/auth/login").json(&json!({ "password": "x" })).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "username": "Please enter a username or email" }));

        let response = server.post("/auth/login").json(&json!({ "username": user.username })).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "password": "Please enter a password" }));

        let response = server
            .post("/auth/login")
            .json(&json!({ "username": "nobody_here", "password": TEST_PASSWORD }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let json: Value = response.json();
        assert!(json["username"].is_string());

        let response = server
            .post("/auth/login")
            .json(&json!({ "username": user.username, "password": "wrong-password" }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        response.assert_json(&json!({ "password": "Password entered is invalid" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_login_sets_cookie_and_stores_token() {
        let state = create_test_state();
        let server = create_test_server(&state);
        let user = create_test_user(&state, Role::Basic).await;

        let response = server
            .post("/auth/login")
            .json(&json!({ "username": user.username, "password": TEST_PASSWORD }))
            .await;
        response.assert_status_ok();

        let set_cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Path=/"));

        let stored = state.tokens.get_by_user(user.id).await.unwrap().unwrap();
        let body: Value = response.json();
        assert_eq!(stored.access_token.as_deref(), body["accessToken"].as_str());

        // Logging in again replaces the row
        login(&server, &user.username, TEST_PASSWORD).await;
        let replaced = state.tokens.get_by_user(user.id).await.unwrap().unwrap();
        assert_eq!(replaced.id, stored.id);
        assert_ne!(replaced.refresh_token, stored.refresh_token);
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_old_cookie_stops_working() {
        let state = create_test_state();
        let server = create_test_server(&state);
        let user = create_test_user(&state, Role::Basic).await;
        let (_, old_cookie) = login(&server, &user.username, TEST_PASSWORD).await;

        let response = server.post("/auth/refresh").add_header("cookie", old_cookie.clone()).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body["accessToken"].is_string());
        let new_cookie = cookie_from(&response);
        assert_ne!(new_cookie, old_cookie);

        server
            .post("/auth/refresh")
            .add_header("cookie", old_cookie)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .post("/auth/refresh")
            .add_header("cookie", new_cookie)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_refresh_picks_up_role_changes() {
        let state = create_test_state();
        let server = create_test_server(&state);
        let user = create_test_user(&state, Role::Basic).await;
        let (_, cookie) = login(&server, &user.username, TEST_PASSWORD).await;

        state
            .users
            .update(
                user.id,
                &crate::db::models::users::UserUpdateDBRequest {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let response = server.post("/auth/refresh").add_header("cookie", cookie).await;
        let body: Value = response.json();
        let claims =
            crate::auth::tokens::verify_token(body["accessToken"].as_str().unwrap(), crate::auth::tokens::TokenKind::Access, &state.config)
                .unwrap();
        assert_eq!(claims.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_refresh_failures() {
        let state = create_test_state();
        let server = create_test_server(&state);
        let user = create_test_user(&state, Role::Basic).await;

        let response = server.post("/auth/refresh").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        response.assert_json(&json!({ "error": "No refresh token was received" }));

        let (_, cookie) = login(&server, &user.username, TEST_PASSWORD).await;
        let tampered = format!("{}x", cookie);
        server
            .post("/auth/refresh")
            .add_header("cookie", tampered)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        // Account gone
        state.users.delete(user.id).await.unwrap();
        server
            .post("/auth/refresh")
            .add_header("cookie", cookie)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[test_log::test(tokio::test)]
    async fn test_logout_revokes_refresh_token() {
        let state = create_test_state();
        let server = create_test_server(&state);
        let user = create_test_user(&state, Role::Basic).await;
        let (_, cookie) = login(&server, &user.username, TEST_PASSWORD).await;

        let response = server.delete("/auth/logout").add_header("cookie", cookie.clone()).await;
        response.assert_status(StatusCode::NO_CONTENT);
        let cleared = response.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
        assert!(cleared.contains("Max-Age=0"));
        assert!(state.tokens.get_by_user(user.id).await.unwrap().is_none());

        server
            .post("/auth/refresh")
            .add_header("cookie", cookie.clone())
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = server.delete("/auth/logout").add_header("cookie", cookie).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "Unable to log out" }));

        server.delete("/auth/logout").await.assert_status(StatusCode::BAD_REQUEST);
    }
}
