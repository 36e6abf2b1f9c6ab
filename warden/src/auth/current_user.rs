use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::tokens::{self, TokenKind},
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, trace};

/// Pull the bearer token out of the Authorization header.
/// Returns:
/// - Ok(None): no Authorization header, or not a Bearer credential
/// - Ok(Some(token)): a bearer token is present
/// - Err(error): the header is not valid UTF-8
fn bearer_token(parts: &Parts) -> Result<Option<&str>> {
    let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = header.to_str().map_err(|e| Error::BadRequest {
        message: format!("Invalid authorization header: {e}"),
    })?;

    Ok(value.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty()))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Some(token) = bearer_token(parts)? else {
            trace!("No bearer access token on request");
            return Err(Error::Unauthenticated {
                message: Some("No access token was received".to_string()),
            });
        };

        match tokens::verify_token(token, TokenKind::Access, &state.config) {
            Ok(user) => {
                debug!("Authenticated user {} from access token", user.id);
                Ok(user)
            }
            Err(Error::Unauthenticated { .. }) => {
                trace!("Access token failed verification");
                Err(Error::Unauthenticated {
                    message: Some("Access token is invalid or has expired".to_string()),
                })
            }
            Err(e) => Err(e),
        }
    }
}
