use crate::auth::AccessError;
use crate::config::ConfigError;
use crate::store::RepositoryError;
use crate::telemetry::TelemetryError;
use crate::workflows::accounts::AccountError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Failures that end a process-level operation: start-up, provisioning, or serving.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("store error: {0}")]
    Store(#[from] RepositoryError),
    #[error("access error: {0}")]
    Access(#[from] AccessError),
    #[error("account error: {0}")]
    Account(#[from] AccountError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Store(err) => err.status_code(),
            AppError::Access(err) => err.status_code(),
            AppError::Account(AccountError::Invalid(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Account(AccountError::Access(err)) => err.status_code(),
            AppError::Account(AccountError::Repository(err)) => err.status_code(),
            AppError::Config(_) | AppError::Telemetry(_) | AppError::Io(_) | AppError::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Store and access failures carry end-user wording; the rest are operator errors.
        let message = match &self {
            AppError::Store(err) => err.user_message().to_string(),
            AppError::Access(err) | AppError::Account(AccountError::Access(err)) => {
                err.user_message().to_string()
            }
            AppError::Account(AccountError::Repository(err)) => err.user_message().to_string(),
            _ => self.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
