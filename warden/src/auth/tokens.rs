//! Access and refresh token creation and verification.
//!
//! Both kinds are HS256 JWTs carrying the same claims but signed with different secrets and
//! given different lifetimes, so a refresh token is never accepted as an access token and vice
//! versa.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::models::users::{CurrentUser, Role},
    config::Config,
    errors::Error,
    types::UserId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn secret<'a>(&self, config: &'a Config) -> Result<&'a str, Error> {
        let secret = match self {
            TokenKind::Access => config.secrets.access_token_secret.as_deref(),
            TokenKind::Refresh => config.secrets.refresh_token_secret.as_deref(),
        };
        secret.ok_or_else(|| Error::Internal {
            operation: format!("sign {self:?} token: secret is not configured"),
        })
    }

    fn lifetime(&self, config: &Config) -> std::time::Duration {
        match self {
            TokenKind::Access => config.auth.tokens.access_token_expiry,
            TokenKind::Refresh => config.auth.tokens.refresh_token_expiry,
        }
    }
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: UserId,      // Subject (user ID)
    pub username: String, // Username
    pub email: String,    // User email
    pub role: Role,       // Role at issue time
    pub jti: Uuid,        // Unique per token
    pub exp: i64,         // Expiration time
    pub iat: i64,         // Issued at
}

impl TokenClaims {
    pub fn new(user: &CurrentUser, kind: TokenKind, config: &Config) -> Self {
        let now = Utc::now();
        let exp = now + kind.lifetime(config);

        Self {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            jti: Uuid::new_v4(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

impl From<TokenClaims> for CurrentUser {
    fn from(claims: TokenClaims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// A freshly minted access/refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub fn create_token(user: &CurrentUser, kind: TokenKind, config: &Config) -> Result<String, Error> {
    let claims = TokenClaims::new(user, kind, config);
    let key = EncodingKey::from_secret(kind.secret(config)?.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create JWT: {e}"),
    })
}

pub fn issue_pair(user: &CurrentUser, config: &Config) -> Result<TokenPair, Error> {
    Ok(TokenPair {
        access_token: create_token(user, TokenKind::Access, config)?,
        refresh_token: create_token(user, TokenKind::Refresh, config)?,
    })
}

/// Verify and decode a token of the given kind.
///
/// Client-side problems (bad signature, expiry, garbage) come back as
/// [`Error::Unauthenticated`]; key or library failures as [`Error::Internal`].
pub fn verify_token(token: &str, kind: TokenKind, config: &Config) -> Result<CurrentUser, Error> {
    let key = DecodingKey::from_secret(kind.secret(config)?.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<TokenClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        // Client errors (401) - malformed tokens, invalid claims, expired tokens
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::ExpiredSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::InvalidIssuer
        | jsonwebtoken::errors::ErrorKind::InvalidAudience
        | jsonwebtoken::errors::ErrorKind::InvalidSubject
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::Json(_)
        | jsonwebtoken::errors::ErrorKind::Utf8(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => Error::Unauthenticated {
            message: Some(format!("{kind:?} token could not be verified")),
        },

        // Server errors (500) - key issues, internal failures
        jsonwebtoken::errors::ErrorKind::InvalidEcdsaKey
        | jsonwebtoken::errors::ErrorKind::InvalidRsaKey(_)
        | jsonwebtoken::errors::ErrorKind::RsaFailedSigning
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithmName
        | jsonwebtoken::errors::ErrorKind::InvalidKeyFormat
        | jsonwebtoken::errors::ErrorKind::MissingAlgorithm
        | jsonwebtoken::errors::ErrorKind::Crypto(_) => Error::Internal {
            operation: format!("JWT verification: {e}"),
        },

        _ => Error::Internal {
            operation: format!("JWT verification (unknown error): {e}"),
        },
    })?;

    Ok(CurrentUser::from(token_data.claims))
}
