use portal_core::{ErrorKind, StorageError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RedirectError {
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("link has expired: {0}")]
    Expired(String),
    #[error("link is disabled: {0}")]
    Disabled(String),
    #[error("storage operation failed: {0}")]
    Storage(#[source] StorageError),
}

impl RedirectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RedirectError::NotFound(_) => ErrorKind::LinkNotFound,
            RedirectError::Expired(_) => ErrorKind::LinkExpired,
            RedirectError::Disabled(_) => ErrorKind::LinkDisabled,
            RedirectError::Storage(e) => e.kind(),
        }
    }
}

impl From<StorageError> for RedirectError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound(code) => RedirectError::NotFound(code),
            other => RedirectError::Storage(other),
        }
    }
}
