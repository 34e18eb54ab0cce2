//! Password recovery handlers

use crate::audit::{audit_log, AuditEvent};
use crate::auth::{ForgotPasswordRequest, ResetPasswordRequest};
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Request a password reset mail
#[utoipa::path(
    post,
    path = "/api/v1/password/forgot",
    tag = "password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 204, description = "Reset mail sent"),
        (status = 400, description = "Invalid input data", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.forgot_password(&request.email).await?;

    audit_log(&AuditEvent::PasswordResetRequested {
        user_id: user.id,
        email: user.email,
    });

    Ok(StatusCode::NO_CONTENT)
}

/// Set a new password using the mailed reset token
#[utoipa::path(
    post,
    path = "/api/v1/password/reset",
    tag = "password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Unknown token or weak password", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.reset_password(request).await?;

    audit_log(&AuditEvent::PasswordChanged {
        user_id: user.id,
        email: user.email,
    });

    Ok(StatusCode::NO_CONTENT)
}
