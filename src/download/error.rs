use thiserror::Error;

use crate::drive::DriveError;

/// Why a single transfer was abandoned. None of these stop the run.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("{operation} '{name}': {source}")]
    Remote {
        operation: &'static str,
        name: String,
        #[source]
        source: DriveError,
    },

    #[error("write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rename '{path}': {source}")]
    Rename {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
