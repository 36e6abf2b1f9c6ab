use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::{debug, info};

use super::user::user_not_found;
use crate::{
    AppState,
    api::models::{
        auth::SuccessResponse,
        items::{ItemCreate, ItemResponse, ItemUpdate, validate_title},
        pagination::Pagination,
        users::CurrentUser,
    },
    auth::policy::{check_item_access, is_self},
    db::{
        errors::DbError,
        handlers::ItemFilter,
        models::items::{ItemCreateDBRequest, ItemDBResponse, ItemUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{ItemId, Operation, Resource, UserId},
};

fn not_found(resource: &str, id: impl ToString) -> Error {
    Error::NotFound {
        resource: resource.to_string(),
        id: id.to_string(),
    }
}

/// Fetch an item and make sure the caller may act on it.
async fn authorized_item(state: &AppState, current_user: &CurrentUser, id: ItemId, action: Operation) -> Result<ItemDBResponse> {
    let item = state.items.get_by_id(id).await?.ok_or_else(|| not_found("Item", id))?;
    if is_self(current_user, item.user_id) {
        return Ok(item);
    }

    let owner = state
        .users
        .get_by_id(item.user_id)
        .await?
        .ok_or_else(|| not_found("User", item.user_id))?;
    check_item_access(current_user, owner.id, owner.role).map_err(|denial| denial.forbid(action, Resource::Items))?;

    debug!("User {} may {action} item {} owned by {}", current_user.id, id, owner.id);
    Ok(item)
}

/// Create an item owned by the caller
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    request_body = ItemCreate,
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 400, description = "Invalid title"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 404, description = "The caller's account no longer exists"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<ItemCreate>,
) -> Result<(StatusCode, Json<ItemResponse>)> {
    let title = validate_title(create.title.as_deref())?;

    // Access tokens outlive account deletion
    if state.users.get_by_id(current_user.id).await?.is_none() {
        return Err(user_not_found(current_user.id));
    }

    let item = state
        .items
        .create(&ItemCreateDBRequest {
            title,
            user_id: current_user.id,
        })
        .await
        .map_err(|e| match e {
            DbError::ForeignKeyViolation { .. } => user_not_found(current_user.id),
            other => Error::Database(other),
        })?;

    info!("User {} created item {}", current_user.id, item.id);
    Ok((StatusCode::CREATED, Json(ItemResponse::from(item))))
}

/// List the caller's items
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    params(Pagination),
    responses(
        (status = 200, description = "Caller's items", body = Vec<ItemResponse>),
        (status = 401, description = "Missing or invalid access token"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    current_user: CurrentUser,
) -> Result<Json<Vec<ItemResponse>>> {
    let filter = ItemFilter::new(current_user.id, pagination.skip(), pagination.limit());
    let items = state.items.list(&filter).await?;

    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// List another user's items
#[utoipa::path(
    get,
    path = "/items/all/{user_id}",
    tag = "items",
    params(
        ("user_id" = String, Path, description = "Owner's user ID"),
        Pagination,
    ),
    responses(
        (status = 200, description = "The user's items", body = Vec<ItemResponse>),
        (status = 401, description = "Not allowed to read this user's items"),
        (status = 404, description = "User has no items, or does not exist"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_user_items(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(pagination): Query<Pagination>,
    current_user: CurrentUser,
) -> Result<Json<Vec<ItemResponse>>> {
    let filter = ItemFilter::new(user_id, pagination.skip(), pagination.limit());
    let items = state.items.list(&filter).await?;
    if items.is_empty() {
        return Err(not_found("Items belonging to requested user", user_id));
    }

    if !is_self(&current_user, user_id) {
        let owner = state
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| not_found("Owner of requested items", user_id))?;
        check_item_access(&current_user, owner.id, owner.role).map_err(|denial| denial.forbid(Operation::ReadAny, Resource::Items))?;
    }

    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// Get one item
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    params(("id" = String, Path, description = "Item ID")),
    responses(
        (status = 200, description = "The item", body = ItemResponse),
        (status = 401, description = "Not allowed to read this item"),
        (status = 404, description = "Item or its owner not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_item(State(state): State<AppState>, Path(id): Path<ItemId>, current_user: CurrentUser) -> Result<Json<ItemResponse>> {
    let item = authorized_item(&state, &current_user, id, Operation::ReadAny).await?;
    Ok(Json(ItemResponse::from(item)))
}

/// Update an item
#[utoipa::path(
    patch,
    path = "/items/{id}",
    tag = "items",
    request_body = ItemUpdate,
    params(("id" = String, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Updated item", body = ItemResponse),
        (status = 400, description = "Invalid title"),
        (status = 401, description = "Not allowed to modify this item"),
        (status = 404, description = "Item or its owner not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
    current_user: CurrentUser,
    Json(update): Json<ItemUpdate>,
) -> Result<Json<ItemResponse>> {
    authorized_item(&state, &current_user, id, Operation::UpdateAny).await?;

    let title = match update.title {
        Some(title) => Some(validate_title(Some(&title))?),
        None => None,
    };

    let item = state
        .items
        .update(id, &ItemUpdateDBRequest { title })
        .await
        .map_err(|e| match e {
            DbError::NotFound => not_found("Item", id),
            other => Error::Database(other),
        })?;

    Ok(Json(ItemResponse::from(item)))
}

/// Delete an item
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    params(("id" = String, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item deleted", body = SuccessResponse),
        (status = 401, description = "Not allowed to delete this item"),
        (status = 404, description = "Item or its owner not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_item(State(state): State<AppState>, Path(id): Path<ItemId>, current_user: CurrentUser) -> Result<Json<SuccessResponse>> {
    let item = authorized_item(&state, &current_user, id, Operation::DeleteAny).await?;

    if !state.items.delete(id).await? {
        return Err(not_found("Item", id));
    }

    info!("User {} deleted item {}", current_user.id, id);
    Ok(Json(SuccessResponse::new(format!("The item titled {} has been deleted", item.title))))
}
