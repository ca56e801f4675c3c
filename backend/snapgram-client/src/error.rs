//! Error types for the Snapgram client
//!
//! Every failure collapses to "the operation failed": callers show
//! `user_message()` and let the user retry. Nothing here is retried
//! automatically.

use remote_store::StoreError;
use thiserror::Error;
use validator::ValidationErrors;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Form input rejected before any remote call
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// No active session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Remote store call failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Message suitable for a user-facing notification
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(_) => "That item no longer exists.".to_string(),
            AppError::Unauthorized(_) => "Please sign in and try again.".to_string(),
            AppError::Store(_) | AppError::Internal(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }

    /// Convert a store error, naming `what` when the backend reports it missing
    pub(crate) fn missing(err: StoreError, what: impl Into<String>) -> Self {
        if err.is_not_found() {
            AppError::NotFound(what.into())
        } else {
            AppError::Store(err)
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            AppError::NotFound(_) => true,
            AppError::Store(err) => err.is_not_found(),
            _ => false,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}
