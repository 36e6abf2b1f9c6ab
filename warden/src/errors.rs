use crate::auth::policy::Denial;
use crate::db::errors::DbError;
use crate::types::{Operation, Resource};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use thiserror::Error as ThisError;

/// Key used for error messages that do not belong to a single request field.
pub const ERROR_KEY: &str = "error";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided, or the access token failed verification
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Caller was refused by the role/ownership policy
    #[error("Insufficient permissions to {action} {resource}: {denial}")]
    InsufficientPermissions {
        action: Operation,
        resource: Resource,
        denial: Denial,
    },

    /// Invalid request data or business rule violation not tied to one field
    #[error("{message}")]
    BadRequest { message: String },

    /// A single request field failed validation
    #[error("Invalid {field}: {message}")]
    InvalidField { field: &'static str, message: String },

    /// Presented credentials were recognised as invalid (wrong password, unknown refresh token)
    #[error("Rejected {field}: {message}")]
    InvalidCredentials { field: &'static str, message: String },

    /// The identity given at login matches no account
    #[error("Unknown identity: {message}")]
    UnknownIdentity { message: String },

    /// Requested resource not found. `resource` doubles as the subject of the client message.
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// Duplicate value for a field that must be unique
    #[error("Conflict on {field}: {message}")]
    Conflict { field: &'static str, message: String },
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientPermissions { .. } => StatusCode::UNAUTHORIZED,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidField { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials { .. } => StatusCode::FORBIDDEN,
            Error::UnknownIdentity { .. } => StatusCode::NOT_FOUND,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::ForeignKeyViolation { .. } => StatusCode::NOT_FOUND,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Conflict { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// The request field the error is reported under in the JSON body.
    pub fn field(&self) -> &'static str {
        match self {
            Error::InvalidField { field, .. } | Error::InvalidCredentials { field, .. } | Error::Conflict { field, .. } => field,
            Error::UnknownIdentity { .. } => "username",
            Error::Database(DbError::UniqueViolation { constraint, .. }) => match constraint.as_deref() {
                Some(c) if c.contains("email") => "email",
                Some(c) if c.contains("username") => "username",
                _ => ERROR_KEY,
            },
            _ => ERROR_KEY,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::InsufficientPermissions { denial, .. } => denial.to_string(),
            Error::BadRequest { message } => message.clone(),
            Error::InvalidField { message, .. } | Error::InvalidCredentials { message, .. } | Error::Conflict { message, .. } => {
                message.clone()
            }
            Error::UnknownIdentity { message } => message.clone(),
            Error::NotFound { resource, .. } => format!("{resource} could not be found"),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { table, constraint, .. } => match (table.as_deref(), constraint.as_deref()) {
                    (Some("users"), Some(c)) if c.contains("email") => "A user with this email already exists".to_string(),
                    (Some("users"), Some(c)) if c.contains("username") => "A user with this username already exists".to_string(),
                    _ => "Resource already exists".to_string(),
                },
                DbError::ForeignKeyViolation { .. } => "Referenced resource could not be found".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Internal server error".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) | Error::Conflict { .. } => {
                tracing::warn!("Constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::InsufficientPermissions { .. } | Error::InvalidCredentials { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::InvalidField { .. } | Error::NotFound { .. } | Error::UnknownIdentity { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let mut body = Map::new();
        body.insert(self.field().to_string(), Value::String(self.user_message()));

        (self.status_code(), Json(Value::Object(body))).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: Error) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_field_errors_are_keyed_by_field() {
        let (status, body) = body_of(Error::InvalidField {
            field: "password2",
            message: "Passwords do not match".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["password2"], "Passwords do not match");
    }

    #[tokio::test]
    async fn test_unique_violation_on_email_reports_email_key() {
        let (status, body) = body_of(Error::Database(DbError::unique("users", "users_email_key"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["email"], "A user with this email already exists");
    }

    #[tokio::test]
    async fn test_denial_is_unauthorized_with_error_key() {
        let (status, body) = body_of(Error::InsufficientPermissions {
            action: Operation::ReadAny,
            resource: Resource::Items,
            denial: Denial::ItemOwnerOrAdmin,
        })
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body["error"],
            "Only the owner of this item, an administrator or a superuser can perform this action"
        );
    }

    #[tokio::test]
    async fn test_internal_errors_do_not_leak() {
        let (status, body) = body_of(Error::Internal {
            operation: "connect to secret backend at 10.0.0.1".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_foreign_key_violation_is_not_found() {
        let (status, body) = body_of(Error::Database(DbError::ForeignKeyViolation {
            constraint: Some("items_user_id_fkey".to_string()),
            table: Some("items".to_string()),
            message: "insert or update on table \"items\" violates foreign key constraint".to_string(),
        }))
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Referenced resource could not be found");
    }

    #[tokio::test]
    async fn test_not_found_hides_id() {
        let (status, body) = body_of(Error::NotFound {
            resource: "Item".to_string(),
            id: "1234".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Item could not be found");
    }

    #[tokio::test]
    async fn test_unknown_identity_is_not_found_under_username() {
        let (status, body) = body_of(Error::UnknownIdentity {
            message: "nobody".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["username"], "nobody");
    }
}
