//! API request/response models for authentication.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Signup body. Every field is optional at the type level so that a missing field is reported
/// under its own key instead of as a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: Option<String>,
    /// Generated from the email address when omitted
    pub username: Option<String>,
    pub password: Option<String>,
    /// Confirmation, must equal `password`
    pub password2: Option<String>,
}

/// Login body. `username` also accepts an email address.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: String,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { success: message.into() }
    }
}

/// Access token body plus the `Set-Cookie` value carrying the refresh token
#[derive(Debug)]
pub struct TokenResponse {
    pub body: AccessTokenResponse,
    pub cookie: String,
}

impl IntoResponse for TokenResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::SET_COOKIE, self.cookie)], Json(self.body)).into_response()
    }
}

/// Empty 204 that also expires the refresh cookie
#[derive(Debug)]
pub struct LogoutResponse {
    pub cookie: String,
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        (StatusCode::NO_CONTENT, [(header::SET_COOKIE, self.cookie)]).into_response()
    }
}
