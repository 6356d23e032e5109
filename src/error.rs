//! Application error taxonomy and its HTTP mapping
//!
//! Services return `AppError`; only the `IntoResponse` impl below decides the
//! status code and envelope.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::error;

use crate::models::response::ErrorResponse;
use crate::services::chain_gateway::ChainError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The entity exists but is in the wrong state for the operation
    #[error("{0}")]
    Precondition(String),

    /// Duplicate of a unique record (KYB address, deposit tx hash)
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Storage(DbErr),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                AppError::Conflict(format!("Duplicate record: {}", detail))
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                AppError::Validation(format!("Referenced record does not exist: {}", detail))
            }
            _ => AppError::Storage(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Precondition(_) | AppError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Chain(ChainError::InvalidAddress(_)) | AppError::Chain(ChainError::InvalidAmount(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Chain(ChainError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Chain(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            AppError::Storage(err) => {
                error!(error = %err, "Storage error");
                ErrorResponse::new("Internal server error")
            }
            AppError::Chain(err) if err.is_retryable() => {
                error!(error = %err, "Chain call timed out");
                ErrorResponse::with_details(
                    "Blockchain operation timed out",
                    format!("{}; the request is retryable", err),
                )
            }
            AppError::Chain(err) if status == StatusCode::BAD_REQUEST => {
                ErrorResponse::with_details("Invalid blockchain input", err.to_string())
            }
            AppError::Chain(err) => {
                error!(error = %err, "Chain error");
                ErrorResponse::with_details("Blockchain operation failed", err.to_string())
            }
            other => ErrorResponse::new(other.to_string()),
        };

        (status, Json(body)).into_response()
    }
}
