use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use axum_helpers::{UuidPath, ValidatedJson};
use serde::Serialize;
use std::sync::Arc;

use crate::error::UserResult;
use crate::models::{CreateUser, UpdateUser, UserFilter, UserResponse};
use crate::repository::UserRepository;
use crate::service::UserService;
use crate::storage::BlobStore;

/// Create the users router with all HTTP endpoints
pub fn router<R, B>(service: UserService<R, B>) -> Router
where
    R: UserRepository + 'static,
    B: BlobStore + 'static,
{
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/{id}",
            get(get_user).patch(update_user).delete(destroy_user),
        )
        .with_state(shared_service)
}

/// List response with pagination info
#[derive(Debug, Serialize)]
struct ListUsersResponse {
    data: Vec<UserResponse>,
    total: usize,
    limit: usize,
    offset: usize,
}

/// Destroy response, confirming the record is gone
#[derive(Debug, Serialize)]
struct DestroyResponse {
    destroyed: bool,
}

/// List users with optional filters
///
/// GET /users?email=ann&status=active&limit=10&offset=0
async fn list_users<R: UserRepository, B: BlobStore>(
    State(service): State<Arc<UserService<R, B>>>,
    Query(filter): Query<UserFilter>,
) -> UserResult<Json<ListUsersResponse>> {
    let limit = filter.limit;
    let offset = filter.offset;
    let (users, total) = service.list_users(filter).await?;

    Ok(Json(ListUsersResponse {
        data: users.into_iter().map(Into::into).collect(),
        total,
        limit,
        offset,
    }))
}

/// Create a new user
///
/// POST /users
async fn create_user<R: UserRepository, B: BlobStore>(
    State(service): State<Arc<UserService<R, B>>>,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> UserResult<impl IntoResponse> {
    let user = service.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Get a user by ID
///
/// GET /users/:id
async fn get_user<R: UserRepository, B: BlobStore>(
    State(service): State<Arc<UserService<R, B>>>,
    UuidPath(id): UuidPath,
) -> UserResult<Json<UserResponse>> {
    let user = service.get_user(id).await?;
    Ok(Json(user.into()))
}

/// Partially update a user
///
/// PATCH /users/:id
async fn update_user<R: UserRepository, B: BlobStore>(
    State(service): State<Arc<UserService<R, B>>>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateUser>,
) -> UserResult<Json<UserResponse>> {
    let user = service.update_user(id, input).await?;
    Ok(Json(user.into()))
}

/// Delete a user and its stored image
///
/// DELETE /users/:id
async fn destroy_user<R: UserRepository, B: BlobStore>(
    State(service): State<Arc<UserService<R, B>>>,
    UuidPath(id): UuidPath,
) -> UserResult<Json<DestroyResponse>> {
    let destroyed = service.destroy_user(id).await?;
    Ok(Json(DestroyResponse { destroyed }))
}
