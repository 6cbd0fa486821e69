//! Persistence boundary shared by every workflow.
//!
//! Each workflow declares the repository trait it needs next to its domain types; this module
//! owns the error vocabulary those traits speak and the in-memory document store that
//! implements all of them behind a single lock.

mod memory;

pub use memory::MemoryStore;

use axum::http::StatusCode;

/// Failure classes reported by the document store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("record already exists")]
    AlreadyExists,
    #[error("record not found")]
    NotFound,
}

impl RepositoryError {
    /// Message safe to show to the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            RepositoryError::PermissionDenied => {
                "You do not have permission to perform this action."
            }
            RepositoryError::Unavailable(_) => {
                "The service is temporarily unavailable. Please try again shortly."
            }
            RepositoryError::AlreadyExists => "This record already exists.",
            RepositoryError::NotFound => GENERIC_FAILURE_MESSAGE,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RepositoryError::PermissionDenied => StatusCode::FORBIDDEN,
            RepositoryError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RepositoryError::AlreadyExists => StatusCode::CONFLICT,
            RepositoryError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";
