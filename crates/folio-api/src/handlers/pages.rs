//! Session-authenticated pages
//!
//! Bodies are minimal JSON documents.

use crate::auth::AuthenticatedUser;
use axum::{extract::Query, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub redirect_url: Option<String>,
}

pub async fn home(user: Option<AuthenticatedUser>) -> impl IntoResponse {
    Json(json!({
        "page": "home",
        "user": user.map(|u| u.0.email),
    }))
}

pub async fn login(Query(query): Query<LoginQuery>) -> impl IntoResponse {
    Json(json!({
        "page": "login",
        "redirect_url": query.redirect_url.unwrap_or_else(|| "/".to_string()),
    }))
}

pub async fn profile(user: AuthenticatedUser) -> impl IntoResponse {
    Json(json!({
        "page": "profile",
        "email": user.0.email,
        "fullname": user.0.fullname,
    }))
}

pub async fn users(user: AuthenticatedUser) -> impl IntoResponse {
    Json(json!({
        "page": "users",
        "viewer": user.0.email,
    }))
}
