//! Items API
//!
//! Reads are public; writes require a bearer token, and changes to an
//! existing item are limited to its owner or a superuser.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::auth::access_gate::Actor;
use crate::item::entity::{CreateItemRequest, Item, ItemFilter, ItemPatch, ItemRead};
use crate::item::service::ItemService;
use crate::shared::api_common::Page;
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;

#[derive(Clone)]
pub struct ItemsState {
    pub item_service: Arc<ItemService>,
}

/// Item list query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ItemsQuery {
    /// Exact category
    pub category: Option<String>,
    /// Case-insensitive substring of title or description
    pub q: Option<String>,
    pub is_claimed: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn ensure_can_modify(actor: &Actor, item: &Item) -> Result<(), PlatformError> {
    if actor.can_modify(&item.owner_email) {
        Ok(())
    } else {
        Err(PlatformError::forbidden("only the owner may modify this item"))
    }
}

/// List items
#[utoipa::path(
    get,
    path = "",
    tag = "items",
    operation_id = "listItems",
    params(ItemsQuery),
    responses(
        (status = 200, description = "Items, newest first", body = Vec<ItemRead>),
        (status = 400, description = "Invalid pagination")
    )
)]
pub async fn list_items(
    State(state): State<ItemsState>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<Vec<ItemRead>>, PlatformError> {
    let page = Page::new(query.limit, query.offset)?;
    let filter = ItemFilter {
        category: query.category,
        text_query: query.q,
        is_claimed: query.is_claimed,
    };

    let items = state.item_service.list_items(&filter, page).await?;
    Ok(Json(items.into_iter().map(ItemRead::from).collect()))
}

/// Post an item
#[utoipa::path(
    post,
    path = "",
    tag = "items",
    operation_id = "createItem",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ItemRead),
        (status = 400, description = "Missing required field"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_item(
    State(state): State<ItemsState>,
    auth: Authenticated,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemRead>), PlatformError> {
    let item = state
        .item_service
        .post_item(req.into_new_item(&auth.email))
        .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// Get item by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "items",
    operation_id = "getItem",
    params(("id" = i64, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item found", body = ItemRead),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<ItemsState>,
    Path(id): Path<i64>,
) -> Result<Json<ItemRead>, PlatformError> {
    Ok(Json(state.item_service.get_item(id).await?.into()))
}

/// Update item
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "items",
    operation_id = "updateItem",
    params(("id" = i64, Path, description = "Item ID")),
    request_body = ItemPatch,
    responses(
        (status = 200, description = "Item updated", body = ItemRead),
        (status = 400, description = "Null or empty required field"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Item not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_item(
    State(state): State<ItemsState>,
    auth: Authenticated,
    Path(id): Path<i64>,
    Json(patch): Json<ItemPatch>,
) -> Result<Json<ItemRead>, PlatformError> {
    let item = state.item_service.get_item(id).await?;
    ensure_can_modify(&auth, &item)?;

    Ok(Json(state.item_service.update(id, patch).await?.into()))
}

/// Delete item
///
/// Deleting an absent item succeeds. Requests that referenced the item are
/// kept with their item reference cleared.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "items",
    operation_id = "deleteItem",
    params(("id" = i64, Path, description = "Item ID")),
    responses(
        (status = 204, description = "Item deleted or absent"),
        (status = 403, description = "Not the owner")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_item(
    State(state): State<ItemsState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<StatusCode, PlatformError> {
    match state.item_service.get_item(id).await {
        Ok(item) => ensure_can_modify(&auth, &item)?,
        Err(PlatformError::NotFound { .. }) => return Ok(StatusCode::NO_CONTENT),
        Err(e) => return Err(e),
    }

    state.item_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark item claimed
#[utoipa::path(
    post,
    path = "/{id}/claim",
    tag = "items",
    operation_id = "claimItem",
    params(("id" = i64, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item claimed", body = ItemRead),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Item not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn claim_item(
    State(state): State<ItemsState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<ItemRead>, PlatformError> {
    let item = state.item_service.get_item(id).await?;
    ensure_can_modify(&auth, &item)?;

    Ok(Json(state.item_service.claim(id).await?.into()))
}

pub fn items_router(state: ItemsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_items, create_item))
        .routes(routes!(get_item, update_item, delete_item))
        .routes(routes!(claim_item))
        .with_state(state)
}
