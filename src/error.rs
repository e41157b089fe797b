//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::ledger::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing required header: {0}")]
    MissingHeader(String),

    // Business rule violations
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error("Ledger store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(StoreError::from(err))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// Stable machine-readable code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::MissingHeader(_) => "missing_header",
            AppError::Domain(domain_err) => match domain_err {
                DomainError::InsufficientFunds { .. } => "insufficient_funds",
                DomainError::AccountNotFound(_) => "account_not_found",
                DomainError::AccountExists(_) => "account_exists",
                DomainError::RequestNotFound(_) => "request_not_found",
                DomainError::Unauthorized(_) => "unauthorized",
                DomainError::InvalidState { .. } => "invalid_state",
                DomainError::InvalidAmount(_) => "invalid_amount",
                DomainError::InvalidCurrency(_) => "invalid_currency",
                DomainError::SameAccountTransfer => "same_account_transfer",
            },
            AppError::Store(StoreError::Conflict(_)) | AppError::Store(StoreError::MaxRetriesExceeded) => {
                "concurrent_modification"
            }
            AppError::Store(_) => "database_error",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) | AppError::MissingHeader(_) => StatusCode::BAD_REQUEST,
            AppError::Domain(domain_err) => match domain_err {
                DomainError::InsufficientFunds { .. }
                | DomainError::InvalidAmount(_)
                | DomainError::InvalidCurrency(_)
                | DomainError::SameAccountTransfer => StatusCode::BAD_REQUEST,
                DomainError::Unauthorized(_) => StatusCode::FORBIDDEN,
                DomainError::AccountNotFound(_) | DomainError::RequestNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                DomainError::InvalidState { .. } | DomainError::AccountExists(_) => {
                    StatusCode::CONFLICT
                }
            },
            AppError::Store(StoreError::Conflict(_)) | AppError::Store(StoreError::MaxRetriesExceeded) => {
                StatusCode::CONFLICT
            }
            AppError::Store(_) | AppError::Internal(_) | AppError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        let details = match &self {
            AppError::InvalidRequest(msg) => Some(msg.clone()),
            AppError::MissingHeader(header) => Some(header.clone()),
            AppError::Domain(domain_err) => Some(domain_err.to_string()),
            AppError::Store(e) => {
                tracing::error!("Ledger store error: {:?}", e);
                None
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                None
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                None
            }
        };

        // Infrastructure failures don't leak their message to the caller
        let error = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
