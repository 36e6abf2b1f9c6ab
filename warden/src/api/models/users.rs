//! API request/response models for users.

use super::pagination::Pagination;
use crate::auth::utils::{is_valid_email, is_valid_username, normalize_email};
use crate::db::models::users::UserDBResponse;
use crate::errors::Error;
use crate::types::UserId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Account role. Variants are declared lowest to highest so the derived ordering is the
/// authorization hierarchy: `Basic < Admin < Superuser`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, PartialOrd, Ord, Hash, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Basic,
    Admin,
    Superuser,
}

/// Profile changes. Absent fields are left untouched; `role` and `verified` are privileged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub photo: Option<String>,
    pub role: Option<Role>,
    pub verified: Option<bool>,
}

const NAME_MAX_LENGTH: usize = 50;
const PHOTO_MAX_LENGTH: usize = 2048;

pub fn check_username(username: &str) -> Result<(), Error> {
    if is_valid_username(username) {
        Ok(())
    } else {
        Err(Error::InvalidField {
            field: "username",
            message: "Username must be 4 to 50 characters long and contain only letters, numbers, '_', '.' or '-'".to_string(),
        })
    }
}

pub fn check_email(email: &str) -> Result<(), Error> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(Error::InvalidField {
            field: "email",
            message: "Please enter a valid email address".to_string(),
        })
    }
}

fn check_name(field: &'static str, label: &str, value: &str) -> Result<(), Error> {
    if (1..=NAME_MAX_LENGTH).contains(&value.chars().count()) {
        Ok(())
    } else {
        Err(Error::InvalidField {
            field,
            message: format!("{label} must be between 1 and {NAME_MAX_LENGTH} characters long"),
        })
    }
}

impl UserUpdate {
    /// Trim and check every present field, lowercasing the email.
    pub fn validate(mut self) -> Result<Self, Error> {
        if let Some(username) = self.username.take() {
            let username = username.trim().to_string();
            check_username(&username)?;
            self.username = Some(username);
        }
        if let Some(email) = self.email.take() {
            let email = normalize_email(&email);
            check_email(&email)?;
            self.email = Some(email);
        }
        if let Some(first_name) = self.first_name.take() {
            let first_name = first_name.trim().to_string();
            check_name("first_name", "First name", &first_name)?;
            self.first_name = Some(first_name);
        }
        if let Some(last_name) = self.last_name.take() {
            let last_name = last_name.trim().to_string();
            check_name("last_name", "Last name", &last_name)?;
            self.last_name = Some(last_name);
        }
        if self
            .photo
            .as_ref()
            .is_some_and(|photo| photo.is_empty() || photo.chars().count() > PHOTO_MAX_LENGTH)
        {
            return Err(Error::InvalidField {
                field: "photo",
                message: format!("Photo URL must be between 1 and {PHOTO_MAX_LENGTH} characters long"),
            });
        }
        Ok(self)
    }
}

/// Full account view, returned to the account owner and to administrators
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Limited account view shown to callers without access to the full record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicUserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Either view of an account, depending on what the caller may see
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum UserView {
    Full(UserResponse),
    Public(PublicUserResponse),
}

/// Query parameters for listing users
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListUsersQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

/// The authenticated caller, decoded from the bearer access token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            email: db.email,
            role: db.role,
            verified: db.verified,
            first_name: db.first_name,
            last_name: db.last_name,
            birth_date: db.birth_date,
            photo: db.photo,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl From<UserDBResponse> for PublicUserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            created_at: db.created_at,
        }
    }
}

impl From<&UserDBResponse> for CurrentUser {
    fn from(db: &UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username.clone(),
            email: db.email.clone(),
            role: db.role,
        }
    }
}
