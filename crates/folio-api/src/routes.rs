//! Route definitions
//!
//! JSON endpoints live under the configured API base (`/api/v1` by default)
//! behind the bearer-token gate. Pages sit at the root behind the session
//! gate. Health and metrics are open.

use crate::auth::{jwt_auth, prevent_self_update, require_any_role, session_auth, PathList};
use crate::handlers::{articles, auth, categories, frontend, health, pages, password, users};
use crate::middleware::{metrics_middleware, security_headers_middleware};
use crate::openapi;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use folio_core::RoleSlug;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

const ADMIN_ONLY: &[RoleSlug] = &[RoleSlug::Admin];

/// Paths the bearer-token gate lets through, relative to the API base
const TOKEN_GATE_EXCLUDES: &[&str] = &[
    "/frontend/auth/signin",
    "/frontend/auth/signout",
    "/auth/signin",
    "/auth/signup",
    "/auth/refresh",
    "/password/forgot",
    "/password/reset",
    "/info",
    "/articles",
    "/articles/*",
    "/categories",
];

/// Page paths reachable without a session
const SESSION_GATE_EXCLUDES: &[&str] = &["/", "/login"];

/// Token gate exclusions as absolute paths under `base`
pub fn token_gate_excludes(base: &str) -> PathList {
    PathList::new(TOKEN_GATE_EXCLUDES.iter().map(|p| format!("{base}{p}")))
}

/// JSON API routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let base = state.config.api_base();
    let at = |path: &str| format!("{base}{path}");

    // Token gate excluded
    let public_routes = Router::new()
        .route(&at("/auth/signin"), post(auth::sign_in))
        .route(&at("/auth/signup"), post(auth::sign_up))
        .route(&at("/auth/refresh"), put(auth::refresh))
        .route(&at("/password/forgot"), post(password::forgot_password))
        .route(&at("/password/reset"), post(password::reset_password))
        .route(&at("/frontend/auth/signin"), post(frontend::sign_in))
        .route(&at("/frontend/auth/signout"), delete(frontend::sign_out))
        .route(&at("/info"), get(health::info))
        .route(&at("/articles"), get(articles::list_published))
        .route(&at("/articles/:slug"), get(articles::get_published))
        .route(&at("/categories"), get(categories::list_categories));

    // Any signed-in principal
    let member_routes = Router::new()
        .route(&at("/auth/signout"), delete(auth::sign_out))
        .route(&at("/users/profile"), get(users::profile));

    // Admin routes that act on another user by id
    let self_guarded_routes = Router::new()
        .route(
            &at("/admin/users/:id"),
            put(users::update_user).delete(users::delete_user),
        )
        .route(&at("/admin/users/:id/status"), put(users::update_user_status))
        .route_layer(middleware::from_fn(prevent_self_update));

    let admin_routes = Router::new()
        .route(
            &at("/admin/users"),
            get(users::list_users).post(users::create_user),
        )
        .route(&at("/admin/users/:id"), get(users::get_user))
        .route(
            &at("/admin/articles"),
            get(articles::list_articles).post(articles::create_article),
        )
        .route(
            &at("/admin/articles/:id"),
            get(articles::get_article)
                .put(articles::update_article)
                .delete(articles::delete_article),
        )
        .route(
            &at("/admin/articles/:id/status"),
            put(articles::update_article_status),
        )
        .route(&at("/admin/categories"), post(categories::create_category))
        .merge(self_guarded_routes)
        .route_layer(middleware::from_fn(require_any_role(
            state.clone(),
            ADMIN_ONLY,
            PathList::default(),
        )));

    Router::new()
        .merge(public_routes)
        .merge(member_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(jwt_auth(
            state.clone(),
            token_gate_excludes(&base),
        )))
}

/// Session-authenticated pages
pub fn page_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(pages::home))
        .route("/login", get(pages::login))
        .route("/profile", get(pages::profile))
        .route("/users", get(pages::users))
        .layer(middleware::from_fn(session_auth(
            state,
            PathList::new(SESSION_GATE_EXCLUDES.iter().copied()),
        )))
}

/// Health, readiness and metrics
pub fn ops_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::prometheus_metrics))
}

/// Assemble the full application router with its global layers
pub fn create_router(state: Arc<AppState>) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(state.config.session.secure)
        .with_always_save(true)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(
            state.config.session.ttl_minutes,
        )));

    Router::new()
        .merge(ops_routes())
        .merge(page_routes(state.clone()))
        .merge(api_routes(state.clone()))
        .merge(openapi::swagger_ui())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(session_layer)
        .with_state(state)
}
