//! Users Admin API
//!
//! Superuser-only identity administration:
//! - GET /users
//! - GET /users/{id}
//! - PATCH /users/{id}

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::info;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::shared::api_common::PaginationParams;
use crate::shared::error::PlatformError;
use crate::shared::middleware::Superuser;
use crate::user::entity::{UserPatch, UserRead};
use crate::user::repository::UserRepository;

#[derive(Clone)]
pub struct UsersState {
    pub user_repo: Arc<UserRepository>,
}

/// List users
#[utoipa::path(
    get,
    path = "",
    tag = "users",
    operation_id = "listUsers",
    params(PaginationParams),
    responses(
        (status = 200, description = "Users ordered by id", body = Vec<UserRead>),
        (status = 400, description = "Invalid pagination"),
        (status = 403, description = "Not a superuser")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<UsersState>,
    _admin: Superuser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<UserRead>>, PlatformError> {
    let users = state.user_repo.list(params.page()?).await?;
    Ok(Json(users.into_iter().map(UserRead::from).collect()))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "users",
    operation_id = "getUser",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserRead),
        (status = 403, description = "Not a superuser"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<UsersState>,
    _admin: Superuser,
    Path(id): Path<i64>,
) -> Result<Json<UserRead>, PlatformError> {
    let user = state
        .user_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| PlatformError::not_found("User", id))?;

    Ok(Json(user.into()))
}

/// Update user
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "users",
    operation_id = "updateUser",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UserPatch,
    responses(
        (status = 200, description = "User updated", body = UserRead),
        (status = 400, description = "Null on a required field"),
        (status = 403, description = "Not a superuser"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<UsersState>,
    admin: Superuser,
    Path(id): Path<i64>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<UserRead>, PlatformError> {
    let mut user = state
        .user_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| PlatformError::not_found("User", id))?;

    patch.apply(&mut user)?;

    if !state.user_repo.update(&user).await? {
        return Err(PlatformError::not_found("User", id));
    }

    info!(user_id = id, admin = %admin.email, "Updated user");
    Ok(Json(user.into()))
}

pub fn users_router(state: UsersState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_users))
        .routes(routes!(get_user, update_user))
        .with_state(state)
}
