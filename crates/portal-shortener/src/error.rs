use portal_core::{CoreError, ErrorKind, StorageError};
use portal_generator::GeneratorError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("invalid custom code: {0}")]
    InvalidCustomCode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("short code already exists: {0}")]
    CodeConflict(String),
    #[error("link was modified concurrently: {code} (expected version {expected}, found {actual})")]
    VersionConflict {
        code: String,
        expected: u64,
        actual: u64,
    },
    #[error("link not found: {0}")]
    LinkNotFound(String),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Storage(StorageError),
}

impl ShortenerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShortenerError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            ShortenerError::InvalidShortCode(_) => ErrorKind::InvalidShortCode,
            ShortenerError::InvalidCustomCode(_) => ErrorKind::InvalidCustomCode,
            ShortenerError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ShortenerError::CodeConflict(_) => ErrorKind::CodeConflict,
            ShortenerError::VersionConflict { .. } => ErrorKind::VersionConflict,
            ShortenerError::LinkNotFound(_) => ErrorKind::LinkNotFound,
            ShortenerError::Generator(e) => e.kind(),
            ShortenerError::Storage(e) => e.kind(),
        }
    }
}

impl From<CoreError> for ShortenerError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortCode(message) => Self::InvalidShortCode(message),
            CoreError::InvalidCustomCode(message) => Self::InvalidCustomCode(message),
        }
    }
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Conflict(code) => Self::CodeConflict(code),
            StorageError::NotFound(code) => Self::LinkNotFound(code),
            other => Self::Storage(other),
        }
    }
}
