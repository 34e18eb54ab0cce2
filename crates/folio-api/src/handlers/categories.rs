//! Category handlers

use super::dto::{CategoryList, CategoryResponse, ListResponse};
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::services::categories::{CreateCategoryRequest, CATEGORY_ORDER_FIELDS};
use crate::services::ListQuery;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// Active categories, for guests
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "categories",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of categories", body = CategoryList)
    )
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = query.to_filter(CATEGORY_ORDER_FIELDS);
    let page = state.categories.list(&filter).await?;

    Ok(Json(ListResponse::<CategoryResponse>::from_page(&filter, page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/categories",
    tag = "categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 403, description = "Admin role required", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let category = state.categories.create(request).await?;
    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}
