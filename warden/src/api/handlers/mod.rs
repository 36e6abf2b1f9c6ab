//! HTTP request handlers.
//!
//! - [`auth`]: signup, login, token refresh and logout
//! - [`user`]: the caller's own profile
//! - [`users`]: other accounts, subject to the role policy
//! - [`items`]: owned items
//!
//! Every handler is instrumented with `skip_all` and documented with `#[utoipa::path]`; the
//! OpenAPI document in [`crate::openapi`] lists them.

pub mod auth;
pub mod items;
pub mod user;
pub mod users;

use crate::{AppState, errors::Result, types::UserId};

/// Remove an account. The repository takes its stored token and items with it in one step.
pub(crate) async fn delete_account(state: &AppState, id: UserId) -> Result<()> {
    if !state.users.delete(id).await? {
        return Err(user::user_not_found(id));
    }

    tracing::debug!("Deleted account {id}");
    Ok(())
}
