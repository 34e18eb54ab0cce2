//! API error handling
//!
//! Every failure leaves the server as `{ "code": <status>, "message": ..., "data": ... }`.

use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use folio_core::FolioError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code
    #[schema(example = 400)]
    pub code: u16,
    /// Human-readable message
    pub message: String,
    /// Field-level validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Validation {
        message: String,
        data: serde_json::Value,
    },
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
    Database(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg) => ApiError::new(status, msg),
            AppError::Validation { message, data } => ApiError::new(status, message).with_data(data),
            AppError::NotFound(resource) => ApiError::new(status, format!("{resource} not found")),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ApiError::new(status, "Internal server error")
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Store error");
                ApiError::new(status, "Database operation failed")
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<FolioError> for AppError {
    fn from(err: FolioError) -> Self {
        match err {
            FolioError::InvalidCredentials
            | FolioError::AccountNotActive
            | FolioError::ValidationFailed(_) => AppError::BadRequest(err.to_string()),
            FolioError::TokenInvalid(_)
            | FolioError::TokenExpired
            | FolioError::TokenBlacklisted
            | FolioError::RefreshMismatch => AppError::Unauthorized(err.to_string()),
            FolioError::Unauthorized(msg) => AppError::Unauthorized(msg),
            FolioError::Forbidden(msg) => AppError::Forbidden(msg),
            FolioError::NotFound(resource) => AppError::NotFound(resource),
            FolioError::Store(msg) => AppError::Database(msg),
            FolioError::Notify(msg) => AppError::Internal(format!("Notification error: {msg}")),
            FolioError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation {
            message: "Invalid input data".to_string(),
            data: serde_json::to_value(&errors).unwrap_or(serde_json::Value::Null),
        }
    }
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingError(e) => AppError::Internal(format!("Token encoding failed: {e}")),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
