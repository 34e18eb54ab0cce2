//! Security audit logging for authentication events
//!
//! Every event is logged with the "audit" target so it can be filtered and
//! routed separately from application logs. Revocation and blacklist-read
//! failures go out at WARN; they mark windows where a signed-out token may
//! still be honoured.

use chrono::Utc;
use folio_core::UserId;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    SignInSuccess {
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    SignInFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    SignUp {
        user_id: UserId,
        email: String,
        ip_address: Option<String>,
    },

    SignOut {
        user_id: UserId,
        ip_address: Option<String>,
    },

    TokenRefresh {
        user_id: UserId,
        ip_address: Option<String>,
    },

    RefreshRejected {
        reason: String,
        ip_address: Option<String>,
    },

    PasswordResetRequested {
        user_id: UserId,
        email: String,
    },

    PasswordChanged {
        user_id: UserId,
        email: String,
    },

    /// Role gate or self-modification guard refused the request
    AccessDenied {
        user_id: Option<UserId>,
        resource: String,
        reason: String,
        ip_address: Option<String>,
    },

    InvalidToken {
        resource: String,
        reason: String,
        ip_address: Option<String>,
    },

    /// An access token could not be written to the blacklist
    RevocationFailed {
        user_id: UserId,
        reason: String,
    },

    /// The blacklist could not be read while authenticating a request
    BlacklistCheckFailed {
        reason: String,
        fail_open: bool,
    },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::SignInSuccess { .. } => "Sign-in successful",
            AuditEvent::SignInFailure { .. } => "Sign-in failed",
            AuditEvent::SignUp { .. } => "Account registered",
            AuditEvent::SignOut { .. } => "Signed out",
            AuditEvent::TokenRefresh { .. } => "Token refreshed",
            AuditEvent::RefreshRejected { .. } => "Token refresh rejected",
            AuditEvent::PasswordResetRequested { .. } => "Password reset requested",
            AuditEvent::PasswordChanged { .. } => "Password changed",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::InvalidToken { .. } => "Invalid token",
            AuditEvent::RevocationFailed { .. } => "Access token revocation failed",
            AuditEvent::BlacklistCheckFailed { .. } => "Blacklist check failed",
        }
    }

    fn is_degraded(&self) -> bool {
        matches!(
            self,
            AuditEvent::RevocationFailed { .. } | AuditEvent::BlacklistCheckFailed { .. }
        )
    }
}

/// Log an audit event
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();
    let event_json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    let summary = event.summary();

    if event.is_degraded() {
        warn!(
            target: "audit",
            timestamp = %timestamp,
            event = %event_json,
            "{summary}"
        );
    } else {
        info!(
            target: "audit",
            timestamp = %timestamp,
            event = %event_json,
            "{summary}"
        );
    }
}

/// Extract IP address from request headers
///
/// Checks X-Forwarded-For, then X-Real-IP.
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            // First hop is the client.
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
