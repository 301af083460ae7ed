//! # Response Bodies & Error Contract
//!
//! Successful extractions answer with an [`OcrResponse`](super::dto::OcrResponse)
//! object. Every failure answers with the flat error body:
//!
//! ```json
//! { "status": "ERROR", "message": "...", "errorCode": "INVALID_INPUT" }
//! ```
//!
//! The HTTP status is derived from the [`ErrorCode`] alone, so handlers never
//! pick a status by hand.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Value of `status` in every error body.
pub const ERROR_STATUS: &str = "ERROR";

/// Machine-readable error code included in every error body.
///
/// Serialized as SCREAMING_SNAKE_CASE on the wire (e.g. `"NO_FILE"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Empty upload, unsupported content type, or a malformed request. HTTP 400.
    InvalidInput,
    /// The multipart request carried no `file` part. HTTP 400.
    NoFile,
    /// The upload could not be read from the request body. HTTP 500.
    FileReadError,
    /// Remote credentials missing while demo fallback is disabled. HTTP 500.
    ConfigurationError,
    /// The remote service rejected the request with a non-retryable status.
    RemoteError,
    /// Every attempt hit a transient failure.
    RetriesExhausted,
    /// The remote reply violated the expected protocol.
    ProtocolError,
    /// The asynchronous read operation did not finish in time.
    PollTimeout,
    /// The asynchronous read operation reported `failed`.
    RemoteOperationFailed,
    /// The request was abandoned because the server is shutting down. HTTP 503.
    Cancelled,
    InternalError,
    /// The endpoint exists but is not available. HTTP 501.
    NotImplemented,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput | Self::NoFile => StatusCode::BAD_REQUEST,
            Self::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::FileReadError
            | Self::ConfigurationError
            | Self::RemoteError
            | Self::RetriesExhausted
            | Self::ProtocolError
            | Self::PollTimeout
            | Self::RemoteOperationFailed
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidInput => Self::InvalidInput,
            ErrorKind::Configuration => Self::ConfigurationError,
            ErrorKind::Remote => Self::RemoteError,
            ErrorKind::RetriesExhausted => Self::RetriesExhausted,
            ErrorKind::Protocol => Self::ProtocolError,
            ErrorKind::PollTimeout => Self::PollTimeout,
            ErrorKind::RemoteOperationFailed => Self::RemoteOperationFailed,
            ErrorKind::Cancelled => Self::Cancelled,
            ErrorKind::Internal => Self::InternalError,
        }
    }
}

/// Error body returned by every endpoint on failure.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Always `"ERROR"`.
    pub status: String,
    pub message: String,
    pub error_code: ErrorCode,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: ERROR_STATUS.to_string(),
            message: message.into(),
            error_code: code,
        }
    }
}

/// Either a success payload or an [`ErrorResponse`].
#[derive(Debug, Clone)]
pub enum ApiResponse<T: Serialize> {
    Success(T),
    Error(ErrorResponse),
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::Success(data)
    }

    /// Error response. HTTP status is derived from the [`ErrorCode`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorResponse::new(code, message))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Success(_) => StatusCode::OK,
            Self::Error(body) => body.error_code.status(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Success(data) => match serde_json::to_value(&data) {
                Ok(body) => (status, Json(body)).into_response(),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize response body");
                    let fallback =
                        ErrorResponse::new(ErrorCode::InternalError, "An internal error occurred");
                    (fallback.error_code.status(), Json(fallback)).into_response()
                }
            },
            Self::Error(body) => (status, Json(body)).into_response(),
        }
    }
}
