use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use portal_core::{CoreError, ErrorKind};
use portal_redirector::RedirectError;
use portal_shortener::ShortenerError;
use serde::Serialize;
use tracing::{debug, error};

pub type Result<T> = std::result::Result<T, AppError>;

/// HTTP status for every error kind. Kinds not listed answer 500.
pub static STATUS_BY_KIND: &[(ErrorKind, StatusCode)] = &[
    (ErrorKind::InvalidUrl, StatusCode::BAD_REQUEST),
    (ErrorKind::InvalidShortCode, StatusCode::BAD_REQUEST),
    (ErrorKind::InvalidCustomCode, StatusCode::BAD_REQUEST),
    (ErrorKind::InvalidRequest, StatusCode::BAD_REQUEST),
    (ErrorKind::LinkDisabled, StatusCode::FORBIDDEN),
    (ErrorKind::LinkNotFound, StatusCode::NOT_FOUND),
    (ErrorKind::CodeConflict, StatusCode::CONFLICT),
    (ErrorKind::VersionConflict, StatusCode::CONFLICT),
    (ErrorKind::LinkExpired, StatusCode::GONE),
    (ErrorKind::ClockRegression, StatusCode::SERVICE_UNAVAILABLE),
    (ErrorKind::StoreUnavailable, StatusCode::SERVICE_UNAVAILABLE),
    (ErrorKind::CacheUnavailable, StatusCode::SERVICE_UNAVAILABLE),
    (ErrorKind::Internal, StatusCode::INTERNAL_SERVER_ERROR),
];

pub fn status_for(kind: ErrorKind) -> StatusCode {
    STATUS_BY_KIND
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, status)| *status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: ErrorKind,
    pub message: String,
}

#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.kind,
            message: self.message.clone(),
        }
    }
}

impl From<ShortenerError> for AppError {
    fn from(e: ShortenerError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<RedirectError> for AppError {
    fn from(e: RedirectError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<CoreError> for AppError {
    fn from(e: CoreError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind);
        if status.is_server_error() {
            error!(kind = %self.kind, error = %self.message, "request failed");
        } else {
            debug!(kind = %self.kind, error = %self.message, "request rejected");
        }

        let body = ErrorBody { error: self.info() };
        (status, Json(body)).into_response()
    }
}
