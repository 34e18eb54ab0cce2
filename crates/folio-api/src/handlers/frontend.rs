//! Session sign-in for the page frontend

use super::auth::SignInRequest;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::session::{sign_in_session, sign_out_session};
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tower_sessions::Session;

/// Sign in to the page frontend
///
/// Stores the account email in the session; no tokens are issued.
#[utoipa::path(
    post,
    path = "/api/v1/frontend/auth/signin",
    tag = "frontend",
    request_body = SignInRequest,
    responses(
        (status = 204, description = "Session established"),
        (status = 400, description = "Invalid credentials or inactive account", body = crate::error::ApiError),
    )
)]
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<SignInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = request.username.trim().to_lowercase();
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    let user = match state.tokens.authenticate(&email, &request.password).await {
        Ok(user) => user,
        Err(err) => {
            audit_log(&AuditEvent::SignInFailure {
                email,
                reason: err.to_string(),
                ip_address,
                user_agent,
            });
            return Err(err.into());
        }
    };

    sign_in_session(&session, &user.email)
        .await
        .map_err(|e| AppError::Internal(format!("Session write failed: {e}")))?;

    audit_log(&AuditEvent::SignInSuccess {
        email: user.email,
        ip_address,
        user_agent,
    });

    Ok(StatusCode::NO_CONTENT)
}

/// Clear the frontend session
#[utoipa::path(
    delete,
    path = "/api/v1/frontend/auth/signout",
    tag = "frontend",
    responses(
        (status = 204, description = "Session cleared")
    )
)]
pub async fn sign_out(session: Session) -> Result<impl IntoResponse, AppError> {
    sign_out_session(&session)
        .await
        .map_err(|e| AppError::Internal(format!("Session flush failed: {e}")))?;

    Ok(StatusCode::NO_CONTENT)
}
