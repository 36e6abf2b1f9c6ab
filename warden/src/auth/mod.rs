//! Authentication and authorization.
//!
//! # Authentication
//!
//! Clients log in via `/auth/login` with a username (or email) and password and receive:
//! - a short-lived access token in the JSON body, sent back as `Authorization: Bearer <token>`
//! - a long-lived refresh token in a signed, HTTP-only cookie, exchanged at `/auth/refresh`
//!
//! Refresh tokens are also stored server side (one row per user) so that logout revokes them.
//!
//! # Authorization
//!
//! Access to other users' accounts and items is decided by [`policy`]: owners always pass,
//! everyone else needs a strictly higher role than the account involved.
//!
//! # Modules
//!
//! - [`current_user`]: extractor yielding the authenticated [`CurrentUser`](crate::api::models::users::CurrentUser)
//! - [`cookies`]: signing and parsing of the refresh cookie
//! - [`password`]: Argon2 hashing
//! - [`policy`]: role/ownership checks
//! - [`tokens`]: JWT issue and verification
//! - [`utils`]: field validation and username generation
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use warden::api::models::users::CurrentUser;
//! use warden::auth::policy::check_account_access;
//!
//! async fn protected_handler(current_user: CurrentUser) -> Result<String, Error> {
//!     Ok(format!("Hello, {}!", current_user.username))
//! }
//! ```

pub mod cookies;
pub mod current_user;
pub mod password;
pub mod policy;
pub mod tokens;
pub mod utils;
