use std::{future::Future, panic::AssertUnwindSafe};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::FutureExt;
use serde::Serialize;
use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Message recorded when a unit of work fails without a usable error value
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Raised by a remote procedure; displays as the bare message
    #[error("{0}")]
    Rpc(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Unauthorized")]
    Unauthorized,
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Config(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<MigrateError> for AppError {
    fn from(error: MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

/// Await one isolated unit of work (a single family in a batch).
///
/// Errors are flattened to their display message; a panic carries no usable
/// error value and is reported as [`UNKNOWN_ERROR`]. Nothing escapes to the
/// caller, so the rest of the batch keeps running.
pub async fn isolate<T, F>(work: F) -> Result<T, String>
where
    F: Future<Output = AppResult<T>>,
{
    match AssertUnwindSafe(work).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(error.to_string()),
        Err(_) => Err(UNKNOWN_ERROR.to_string()),
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
