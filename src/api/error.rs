//! API error handling.
//!
//! Every failure leaves the API as an [`ApiError`] JSON body:
//!
//! ```json
//! {"code": 404, "message": "failed to retrieve item with id 3",
//!  "operation": "GET /api/v1/todo/3", "embeddedError": "item with id 3 not found"}
//! ```

use crate::Error;
use crate::observability::current_request_id;
use axum::{
    Json,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Structured error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// HTTP status code, repeated in the body.
    pub code: u16,
    /// What the handler was trying to do.
    pub message: String,
    /// `"<METHOD> <path>"` of the request.
    pub operation: String,
    /// Display string of the underlying error; empty when there is none.
    pub embedded_error: String,
}

impl ApiError {
    /// Creates an error with no underlying cause.
    #[must_use]
    pub fn new(
        status: StatusCode,
        message: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            operation: operation.into(),
            embedded_error: String::new(),
        }
    }

    /// Wraps a crate error, picking the status from its kind.
    #[must_use]
    pub fn from_error(
        error: &Error,
        message: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::new(status_for(error), message, operation).with_cause(error)
    }

    /// Creates a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, operation)
    }

    /// Attaches the display string of `cause`.
    #[must_use]
    pub fn with_cause(mut self, cause: impl std::fmt::Display) -> Self {
        self.embedded_error = cause.to_string();
        self
    }

    /// Returns the HTTP status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let request_id = current_request_id().unwrap_or_default();
        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                operation = %self.operation,
                cause = %self.embedded_error,
                "{}", self.message
            );
        } else {
            tracing::debug!(
                request_id = %request_id,
                status = self.code,
                operation = %self.operation,
                cause = %self.embedded_error,
                "{}", self.message
            );
        }
        (status, Json(self)).into_response()
    }
}

/// Maps an error kind to its HTTP status.
///
/// | Kind | Status |
/// |------|--------|
/// | `NotFound` | 404 |
/// | `MalformedRequest` | 400 |
/// | anything else | 500 |
#[must_use]
pub const fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::MalformedRequest(_) => StatusCode::BAD_REQUEST,
        Error::InvalidStatus(_)
        | Error::Persistence { .. }
        | Error::NotReady { .. }
        | Error::InvalidConfig(_)
        | Error::FeatureNotEnabled(_)
        | Error::OperationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Formats the `operation` field.
#[must_use]
pub fn format_operation(method: &Method, uri: &Uri) -> String {
    format!("{method} {}", uri.path())
}
