use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors related to the core functionality of the short-link service.
pub type Result<T> = std::result::Result<T, CoreError>;

/// The service-wide error taxonomy.
///
/// Every crate-level error maps onto exactly one kind, and the outer
/// surfaces (HTTP status codes, log fields) are derived from the kind only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrl,
    InvalidShortCode,
    InvalidCustomCode,
    InvalidRequest,
    CodeConflict,
    VersionConflict,
    LinkNotFound,
    LinkExpired,
    LinkDisabled,
    ClockRegression,
    StoreUnavailable,
    CacheUnavailable,
    Internal,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 13] = [
        ErrorKind::InvalidUrl,
        ErrorKind::InvalidShortCode,
        ErrorKind::InvalidCustomCode,
        ErrorKind::InvalidRequest,
        ErrorKind::CodeConflict,
        ErrorKind::VersionConflict,
        ErrorKind::LinkNotFound,
        ErrorKind::LinkExpired,
        ErrorKind::LinkDisabled,
        ErrorKind::ClockRegression,
        ErrorKind::StoreUnavailable,
        ErrorKind::CacheUnavailable,
        ErrorKind::Internal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "invalid_url",
            ErrorKind::InvalidShortCode => "invalid_short_code",
            ErrorKind::InvalidCustomCode => "invalid_custom_code",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::CodeConflict => "code_conflict",
            ErrorKind::VersionConflict => "version_conflict",
            ErrorKind::LinkNotFound => "link_not_found",
            ErrorKind::LinkExpired => "link_expired",
            ErrorKind::LinkDisabled => "link_disabled",
            ErrorKind::ClockRegression => "clock_regression",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::CacheUnavailable => "cache_unavailable",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("invalid custom code: {0}")]
    InvalidCustomCode(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidShortCode(_) => ErrorKind::InvalidShortCode,
            CoreError::InvalidCustomCode(_) => ErrorKind::InvalidCustomCode,
        }
    }
}

/// Errors reported by the durable store contracts.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short code already exists: {0}")]
    Conflict(String),
    /// Missing code, soft-deleted record or version mismatch.
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Conflict(_) => ErrorKind::CodeConflict,
            StorageError::NotFound(_) => ErrorKind::LinkNotFound,
            StorageError::Unavailable(_) | StorageError::Timeout(_) => ErrorKind::StoreUnavailable,
            StorageError::Query(_) | StorageError::InvalidData(_) | StorageError::Operation(_) => {
                ErrorKind::Internal
            }
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache value is invalid: {0}")]
    InvalidData(String),
    #[error("cache initialization failed: {0}")]
    Initialization(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

impl CacheError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::CacheUnavailable
    }
}

/// Errors reported by an external atomic counter.
#[derive(Debug, Clone, Error)]
pub enum SequenceError {
    #[error("sequence backend unavailable: {0}")]
    Unavailable(String),
    #[error("sequence operation timed out: {0}")]
    Timeout(String),
    #[error("sequence value is invalid: {0}")]
    InvalidData(String),
}

impl SequenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SequenceError::Unavailable(_) | SequenceError::Timeout(_) => {
                ErrorKind::StoreUnavailable
            }
            SequenceError::InvalidData(_) => ErrorKind::Internal,
        }
    }
}
