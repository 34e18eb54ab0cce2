//! OpenAPI document and Swagger UI

use crate::auth::{ForgotPasswordRequest, ResetPasswordRequest, SignUpRequest, TokenPair};
use crate::error::ApiError;
use crate::handlers::{self, auth, dto, health};
use crate::services::articles::{ArticleStatusRequest, CreateArticleRequest, UpdateArticleRequest};
use crate::services::categories::CreateCategoryRequest;
use crate::services::users::{CreateUserRequest, UpdateStatusRequest, UpdateUserRequest};
use crate::state::AppState;
use axum::Router;
use std::sync::Arc;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Folio API",
        description = "Content management backend: token and session auth, users, articles and categories"
    ),
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::health::info,
        handlers::auth::sign_in,
        handlers::auth::sign_up,
        handlers::auth::refresh,
        handlers::auth::sign_out,
        handlers::password::forgot_password,
        handlers::password::reset_password,
        handlers::frontend::sign_in,
        handlers::frontend::sign_out,
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::update_user_status,
        handlers::users::delete_user,
        handlers::users::profile,
        handlers::articles::list_articles,
        handlers::articles::create_article,
        handlers::articles::get_article,
        handlers::articles::update_article,
        handlers::articles::update_article_status,
        handlers::articles::delete_article,
        handlers::articles::list_published,
        handlers::articles::get_published,
        handlers::categories::list_categories,
        handlers::categories::create_category,
    ),
    components(schemas(
        ApiError,
        TokenPair,
        auth::SignInRequest,
        auth::RefreshRequest,
        SignUpRequest,
        ForgotPasswordRequest,
        ResetPasswordRequest,
        CreateUserRequest,
        UpdateUserRequest,
        UpdateStatusRequest,
        CreateArticleRequest,
        UpdateArticleRequest,
        ArticleStatusRequest,
        CreateCategoryRequest,
        dto::RoleResponse,
        dto::UserResponse,
        dto::ArticleResponse,
        dto::CategoryResponse,
        dto::MetaResponse,
        dto::UserList,
        dto::ArticleList,
        dto::CategoryList,
        health::HealthResponse,
        health::ReadinessResponse,
        health::InfoResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Liveness, readiness and info"),
        (name = "auth", description = "Token sign-in, sign-up, refresh and sign-out"),
        (name = "password", description = "Password recovery"),
        (name = "frontend", description = "Session sign-in for pages"),
        (name = "users", description = "User administration and profile"),
        (name = "articles", description = "Articles"),
        (name = "categories", description = "Categories"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Swagger UI at `/swagger-ui`, document at `/api-docs/openapi.json`
pub fn swagger_ui() -> Router<Arc<AppState>> {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
