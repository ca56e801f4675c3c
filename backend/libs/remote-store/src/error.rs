//! Error types for remote store calls

use thiserror::Error;

/// Result type alias for remote store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure of a call against the hosted backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// Document, file, account or session does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or invalid session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request rejected by the backend (bad query, bad cursor, bad payload)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Any other non-success response
    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Connection, TLS or body transfer failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing or malformed client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Build an error from a non-success HTTP status and the backend's message
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 => Self::InvalidRequest(message),
            401 | 403 => Self::Unauthorized(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::Remote { status, message },
        }
    }

    /// HTTP-style status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Unauthorized(_) => 401,
            Self::Conflict(_) => 409,
            Self::InvalidRequest(_) => 400,
            Self::Remote { status, .. } => *status,
            Self::Transport(_) => 502,
            Self::Serialization(_) | Self::Config(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
