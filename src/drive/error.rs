use thiserror::Error;

use crate::retry::Retryable;

/// Errors surfaced by the remote directory service.
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("HTTP {status} from {operation}: {message}")]
    HttpStatus {
        status: u16,
        operation: &'static str,
        message: String,
    },

    #[error("Folder '{0}' not found")]
    FolderNotFound(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Retryable for DriveError {
    /// Rate limiting, server-side failures and dropped connections are
    /// transient. Auth, not-found and decode failures are not.
    fn is_retryable(&self) -> bool {
        match self {
            DriveError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            DriveError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            DriveError::FolderNotFound(_) => false,
            DriveError::Json(_) => false,
            DriveError::Io(_) => false,
        }
    }
}
