//! Maps relay and auth errors to HTTP responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_core::RelayError;
use relay_protocol::{ErrorResponse, ProtocolError};
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::AuthError;
use crate::metrics;

/// Any failure a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    /// The body or query string did not have the expected shape.
    #[error("malformed request: {0}")]
    BadBody(String),

    /// A bug on our side, e.g. a command producing the wrong outcome.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        ApiError::Relay(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadBody(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadBody(rejection.body_text())
    }
}

const INTERNAL: &str = "Internal Server Error";

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Auth(AuthError::Issue(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", INTERNAL.into())
            }
            ApiError::Auth(e) => (StatusCode::UNAUTHORIZED, "auth", format!("invalid auth: {e}")),
            ApiError::Relay(RelayError::NotFound) => {
                (StatusCode::NOT_FOUND, "not_found", RelayError::NotFound.to_string())
            }
            ApiError::Relay(RelayError::Forbidden) => {
                (StatusCode::FORBIDDEN, "forbidden", RelayError::Forbidden.to_string())
            }
            ApiError::Relay(e @ RelayError::Malformed(_)) => {
                (StatusCode::BAD_REQUEST, "malformed", e.to_string())
            }
            ApiError::Relay(RelayError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage", INTERNAL.into())
            }
            ApiError::BadBody(_) => (StatusCode::BAD_REQUEST, "malformed", self.to_string()),
            ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", INTERNAL.into())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.status_and_message();

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        metrics::record_error(kind);

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
