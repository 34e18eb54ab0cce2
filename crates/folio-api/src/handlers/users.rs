//! User administration and profile handlers

use super::dto::{ListResponse, UserList, UserResponse};
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::{PathParam, ValidatedJson};
use crate::services::users::{
    CreateUserRequest, UpdateStatusRequest, UpdateUserRequest, USER_ORDER_FIELDS,
};
use crate::services::ListQuery;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use folio_core::{UserId, UserStatus};
use std::sync::Arc;

/// List users with their roles
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "users",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of users", body = UserList),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 403, description = "Admin role required", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = query.to_filter(USER_ORDER_FIELDS);
    let page = state.user_admin.list(&filter).await?;

    Ok(Json(ListResponse::<UserResponse>::from_page(&filter, page)))
}

/// Create a user and assign roles
#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input or duplicate email", body = crate::error::ApiError),
        (status = 403, description = "Admin role required", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.user_admin.create(request).await?;
    tracing::info!(user_id = detail.user.id, "User created");

    Ok((StatusCode::CREATED, Json(UserResponse::from(detail))))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "No such user", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<UserId>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.user_admin.get(id).await?;
    Ok(Json(UserResponse::from(detail)))
}

/// Update another user's profile
///
/// Blank fields are left unchanged; roles are replaced only when given.
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 403, description = "Own account or admin role required", body = crate::error::ApiError),
        (status = 404, description = "No such user", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<UserId>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.user_admin.update(id, request).await?;
    Ok(Json(UserResponse::from(detail)))
}

/// Change another user's status
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/status",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Unknown status", body = crate::error::ApiError),
        (status = 403, description = "Own account or admin role required", body = crate::error::ApiError),
        (status = 404, description = "No such user", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user_status(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<UserId>,
    ValidatedJson(request): ValidatedJson<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = request.status.parse::<UserStatus>()?;
    let detail = state.user_admin.set_status(id, status).await?;
    tracing::info!(user_id = id, status = %status, "User status changed");

    Ok(Json(UserResponse::from(detail)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Own account or admin role required", body = crate::error::ApiError),
        (status = 404, description = "No such user", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<UserId>,
) -> Result<impl IntoResponse, AppError> {
    state.user_admin.delete(id).await?;
    tracing::info!(user_id = id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user's own profile
#[utoipa::path(
    get,
    path = "/api/v1/users/profile",
    tag = "users",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn profile(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let roles = state.roles.roles_for_principal(user.id()).await?;

    Ok(Json(UserResponse::from(crate::services::UserDetail {
        user: user.0,
        roles,
    })))
}
