//! Error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use bukubesar_db::RepositoryError;
use bukubesar_shared::ErrorKind;

/// An error rendered as `{ "error", "message", "retryable" }`.
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    code: &'static str,
    message: String,
    retryable: bool,
}

impl ApiError {
    /// A request-shape problem the handler caught itself.
    #[must_use]
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            code,
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns the taxonomy bucket.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl<E> From<E> for ApiError
where
    E: Into<RepositoryError>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        let kind = err.kind();
        let retryable = err.is_retryable();
        let message = match kind {
            ErrorKind::Internal => {
                error!(error = %err, "request failed");
                "An internal error occurred".to_string()
            }
            _ if retryable => {
                warn!(error = %err, "request hit contention");
                err.to_string()
            }
            _ => err.to_string(),
        };
        Self {
            kind,
            code: err.error_code(),
            message,
            retryable,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.kind.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            Json(json!({
                "error": self.code,
                "message": self.message,
                "retryable": self.retryable,
            })),
        )
            .into_response()
    }
}
