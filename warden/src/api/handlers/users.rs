//! Endpoints acting on other users' accounts under `/users`.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::info;

use super::user::{or_user_not_found, user_not_found};
use crate::{
    AppState,
    api::models::{
        auth::SuccessResponse,
        users::{CurrentUser, ListUsersQuery, PublicUserResponse, UserResponse, UserUpdate, UserView},
    },
    auth::policy::{check_account_access, check_profile_update, is_admin, is_self},
    db::{handlers::UserFilter, models::users::UserUpdateDBRequest},
    errors::Result,
    types::{Operation, Resource, UserId},
};

fn access_op(current_user: &CurrentUser, target: UserId, own: Operation, any: Operation) -> Operation {
    if is_self(current_user, target) { own } else { any }
}

/// List accounts
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Full records for administrators, public views otherwise", body = Vec<UserView>),
        (status = 401, description = "Missing or invalid access token"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
    current_user: CurrentUser,
) -> Result<Json<Vec<UserView>>> {
    let filter = UserFilter::new(query.pagination.skip(), query.pagination.limit());
    let users = state.users.list(&filter).await?;

    let full = is_admin(current_user.role);
    let views = users
        .into_iter()
        .map(|user| {
            if full {
                UserView::Full(UserResponse::from(user))
            } else {
                UserView::Public(PublicUserResponse::from(user))
            }
        })
        .collect();

    Ok(Json(views))
}

/// Get one account
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Full record for the owner or an administrator, public view otherwise", body = UserView),
        (status = 401, description = "Missing or invalid access token"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<UserId>, current_user: CurrentUser) -> Result<Json<UserView>> {
    let user = state.users.get_by_id(id).await?.ok_or_else(|| user_not_found(id))?;

    let view = if is_self(&current_user, id) || is_admin(current_user.role) {
        UserView::Full(UserResponse::from(user))
    } else {
        UserView::Public(PublicUserResponse::from(user))
    };

    Ok(Json(view))
}

/// Update an account
#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "users",
    request_body = UserUpdate,
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 400, description = "Invalid or duplicate field, keyed by field name"),
        (status = 401, description = "Not authenticated, or not allowed to modify this account"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    current_user: CurrentUser,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    let target = state.users.get_by_id(id).await?.ok_or_else(|| user_not_found(id))?;
    let action = access_op(&current_user, id, Operation::UpdateOwn, Operation::UpdateAny);

    check_account_access(&current_user, target.id, target.role).map_err(|denial| denial.forbid(action, Resource::Users))?;
    check_profile_update(&current_user, &update).map_err(|denial| denial.forbid(action, Resource::Users))?;
    let update = update.validate()?;

    let user = state
        .users
        .update(id, &UserUpdateDBRequest::from(update))
        .await
        .map_err(or_user_not_found(id))?;

    Ok(Json(UserResponse::from(user)))
}

/// Delete an account, its stored tokens and its items
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account deleted", body = SuccessResponse),
        (status = 401, description = "Not authenticated, or not allowed to delete this account"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<UserId>, current_user: CurrentUser) -> Result<Json<SuccessResponse>> {
    let target = state.users.get_by_id(id).await?.ok_or_else(|| user_not_found(id))?;
    let action = access_op(&current_user, id, Operation::DeleteOwn, Operation::DeleteAny);

    check_account_access(&current_user, target.id, target.role).map_err(|denial| denial.forbid(action, Resource::Users))?;

    super::delete_account(&state, id).await?;

    info!("User {} deleted account {}", current_user.id, id);
    Ok(Json(SuccessResponse::new(format!("The account with ID {id} has been successfully deleted"))))
}
