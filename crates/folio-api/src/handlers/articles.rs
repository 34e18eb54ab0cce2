//! Article handlers: admin management and guest reads

use super::dto::{ArticleList, ArticleResponse, ListResponse};
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::{PathParam, ValidatedJson};
use crate::services::articles::{
    ArticleStatusRequest, CreateArticleRequest, UpdateArticleRequest, ARTICLE_ORDER_FIELDS,
};
use crate::services::ListQuery;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use folio_core::ArticleStatus;
use std::sync::Arc;

/// List every article regardless of status
#[utoipa::path(
    get,
    path = "/api/v1/admin/articles",
    tag = "articles",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of articles", body = ArticleList),
        (status = 403, description = "Admin role required", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = query.to_filter(ARTICLE_ORDER_FIELDS);
    let page = state.articles.list(&filter).await?;

    Ok(Json(ListResponse::<ArticleResponse>::from_page(&filter, page)))
}

/// Create an article authored by the caller
#[utoipa::path(
    post,
    path = "/api/v1/admin/articles",
    tag = "articles",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Article created", body = ArticleResponse),
        (status = 400, description = "Invalid input or slug in use", body = crate::error::ApiError),
        (status = 403, description = "Admin role required", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_article(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateArticleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let article = state.articles.create(user.id(), request).await?;
    tracing::info!(article_id = article.id, slug = %article.slug, "Article created");

    Ok((StatusCode::CREATED, Json(ArticleResponse::from(article))))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/articles/{id}",
    tag = "articles",
    params(("id" = i64, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article", body = ArticleResponse),
        (status = 404, description = "No such article", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_article(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<impl IntoResponse, AppError> {
    let article = state.articles.get(id).await?;
    Ok(Json(ArticleResponse::from(article)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/articles/{id}",
    tag = "articles",
    params(("id" = i64, Path, description = "Article id")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated article", body = ArticleResponse),
        (status = 400, description = "Invalid input or slug in use", body = crate::error::ApiError),
        (status = 404, description = "No such article", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_article(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
    ValidatedJson(request): ValidatedJson<UpdateArticleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let article = state.articles.update(id, request).await?;
    Ok(Json(ArticleResponse::from(article)))
}

/// Move an article between draft, published and archived
#[utoipa::path(
    put,
    path = "/api/v1/admin/articles/{id}/status",
    tag = "articles",
    params(("id" = i64, Path, description = "Article id")),
    request_body = ArticleStatusRequest,
    responses(
        (status = 200, description = "Updated article", body = ArticleResponse),
        (status = 400, description = "Unknown status", body = crate::error::ApiError),
        (status = 404, description = "No such article", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_article_status(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
    ValidatedJson(request): ValidatedJson<ArticleStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = request.status.parse::<ArticleStatus>()?;
    let article = state.articles.set_status(id, status).await?;

    Ok(Json(ArticleResponse::from(article)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/articles/{id}",
    tag = "articles",
    params(("id" = i64, Path, description = "Article id")),
    responses(
        (status = 204, description = "Article deleted"),
        (status = 404, description = "No such article", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.articles.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Published articles, for guests
#[utoipa::path(
    get,
    path = "/api/v1/articles",
    tag = "articles",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of published articles", body = ArticleList)
    )
)]
pub async fn list_published(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = query.to_filter(ARTICLE_ORDER_FIELDS);
    let page = state.articles.list_published(&filter).await?;

    Ok(Json(ListResponse::<ArticleResponse>::from_page(&filter, page)))
}

/// A published article by slug
#[utoipa::path(
    get,
    path = "/api/v1/articles/{slug}",
    tag = "articles",
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "Article", body = ArticleResponse),
        (status = 404, description = "No published article with this slug", body = crate::error::ApiError),
    )
)]
pub async fn get_published(
    State(state): State<Arc<AppState>>,
    PathParam(slug): PathParam<String>,
) -> Result<impl IntoResponse, AppError> {
    let article = state.articles.view_published(&slug).await?;
    Ok(Json(ArticleResponse::from(article)))
}
