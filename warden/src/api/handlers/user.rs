//! Self-service profile endpoints under `/user`.

use axum::{Json, extract::State};
use tracing::info;

use crate::{
    AppState,
    api::models::{
        auth::SuccessResponse,
        users::{CurrentUser, UserResponse, UserUpdate},
    },
    auth::policy::check_profile_update,
    db::{errors::DbError, models::users::UserUpdateDBRequest},
    errors::{Error, Result},
    types::{Operation, Resource, UserId},
};

pub(super) fn user_not_found(id: UserId) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

/// Map a repository `NotFound` on a user update to the API's 404.
pub(super) fn or_user_not_found(id: UserId) -> impl FnOnce(DbError) -> Error {
    move |e| match e {
        DbError::NotFound => user_not_found(id),
        other => Error::Database(other),
    }
}

/// Get the caller's profile
#[utoipa::path(
    get,
    path = "/user",
    tag = "user",
    responses(
        (status = 200, description = "Caller's profile", body = UserResponse),
        (status = 401, description = "Missing or invalid access token"),
        (status = 404, description = "Account no longer exists"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_current_user(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    let user = state
        .users
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| user_not_found(current_user.id))?;

    Ok(Json(UserResponse::from(user)))
}

/// Update the caller's profile
#[utoipa::path(
    patch,
    path = "/user",
    request_body = UserUpdate,
    tag = "user",
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 400, description = "Invalid or duplicate field, keyed by field name"),
        (status = 401, description = "Not authenticated, or not allowed to change role/verified"),
        (status = 404, description = "Account no longer exists"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_current_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    check_profile_update(&current_user, &update).map_err(|denial| denial.forbid(Operation::UpdateOwn, Resource::Users))?;
    let update = update.validate()?;

    let user = state
        .users
        .update(current_user.id, &UserUpdateDBRequest::from(update))
        .await
        .map_err(or_user_not_found(current_user.id))?;

    Ok(Json(UserResponse::from(user)))
}

/// Delete the caller's account, its stored tokens and its items
#[utoipa::path(
    delete,
    path = "/user",
    tag = "user",
    responses(
        (status = 200, description = "Account deleted", body = SuccessResponse),
        (status = 401, description = "Missing or invalid access token"),
        (status = 404, description = "Account no longer exists"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_current_user(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<SuccessResponse>> {
    super::delete_account(&state, current_user.id).await?;

    info!("User {} deleted their account", current_user.id);
    Ok(Json(SuccessResponse::new("Your account has successfully been deleted")))
}
