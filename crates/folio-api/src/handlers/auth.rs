//! Authentication API handlers
//!
//! Token sign-in, sign-up, refresh rotation and sign-out.

use super::dto::UserResponse;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{bearer_token, SignUpRequest, TokenPair};
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::services::UserDetail;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use folio_core::FolioError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Credentials for token sign-in
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SignInRequest {
    /// Account email
    #[validate(email)]
    #[schema(example = "admin@example.com")]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Refresh token presented for rotation
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub token: String,
}

fn require_bearer(headers: &HeaderMap) -> Result<String, AppError> {
    bearer_token(headers)
        .map(str::to_string)
        .ok_or_else(|| AppError::Unauthorized("Missing or invalid authorization header".to_string()))
}

/// Sign in with email and password
///
/// Returns a fresh access/refresh pair. Any refresh token issued earlier to
/// the same account stops working.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signin",
    tag = "auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Sign-in successful", body = TokenPair),
        (status = 400, description = "Invalid credentials or inactive account", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<SignInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    match state.tokens.sign_in(&request.username, &request.password).await {
        Ok(pair) => {
            audit_log(&AuditEvent::SignInSuccess {
                email: request.username.to_lowercase(),
                ip_address,
                user_agent,
            });
            Ok(Json(pair))
        }
        Err(err) => {
            if matches!(
                err,
                FolioError::InvalidCredentials | FolioError::AccountNotActive
            ) {
                audit_log(&AuditEvent::SignInFailure {
                    email: request.username.to_lowercase(),
                    reason: err.to_string(),
                    ip_address,
                    user_agent,
                });
            }
            Err(err.into())
        }
    }
}

/// Register a new account
///
/// The email is stored lowercased. New accounts hold no roles.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "auth",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid input or email already registered", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.sign_up(request).await?;

    audit_log(&AuditEvent::SignUp {
        user_id: user.id,
        email: user.email.clone(),
        ip_address: extract_ip_address(&headers),
    });

    Ok(Json(UserResponse::from(UserDetail {
        user,
        roles: Vec::new(),
    })))
}

/// Rotate the token pair
///
/// The current access token goes in the `Authorization` header and may be
/// expired. The refresh token must be the one cached at the last sign-in.
#[utoipa::path(
    put,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid access token or refresh mismatch", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let access = require_bearer(&headers)?;
    let ip_address = extract_ip_address(&headers);

    match state.tokens.refresh(&access, &request.token).await {
        Ok(pair) => {
            if let Ok(claims) = state.tokens.extract_claims(&pair.access) {
                if let Ok(user_id) = claims.principal_id() {
                    audit_log(&AuditEvent::TokenRefresh {
                        user_id,
                        ip_address,
                    });
                }
            }
            Ok(Json(pair))
        }
        Err(err) => {
            audit_log(&AuditEvent::RefreshRejected {
                reason: err.to_string(),
                ip_address,
            });
            Err(err.into())
        }
    }
}

/// Sign out
///
/// Drops the account's refresh token and revokes the presented access token.
#[utoipa::path(
    delete,
    path = "/api/v1/auth/signout",
    tag = "auth",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let access = require_bearer(&headers)?;
    let user_id = state.tokens.sign_out(&access).await?;

    audit_log(&AuditEvent::SignOut {
        user_id,
        ip_address: extract_ip_address(&headers),
    });

    Ok(StatusCode::NO_CONTENT)
}
