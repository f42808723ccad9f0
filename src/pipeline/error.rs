use thiserror::Error;

use crate::auth::Capability;
use crate::database::DatabaseError;
use crate::services::backup::BackupError;

/// Every way a request flow can end without doing its work
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Statement failure; the connection has already been released
    #[error("{0}")]
    Store(#[from] DatabaseError),

    /// Missing or malformed input, detected before any side effect
    #[error("Bad request payload: {0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthenticated,

    /// Capability denied, or the check itself failed
    #[error("Missing capability '{0}'")]
    Denied(Capability),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Backup(#[from] BackupError),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation(message.into())
    }
}
