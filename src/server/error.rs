//! HTTP error mapping
//!
//! Every failure leaves the API as `{"message": "..."}` with a status code
//! derived from the crate [`Error`](crate::Error). Storage details are logged
//! and never returned to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::Error;

/// The one body shape for plain confirmations and for errors
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error returned by every handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Map a crate error, using `context` as the client message for
    /// server-side failures
    pub fn with_context(err: Error, context: &str) -> Self {
        match err {
            Error::Validation(msg) => Self::bad_request(msg),
            Error::Acquisition(msg) => {
                tracing::warn!("{}: {}", context, msg);
                Self::bad_request(msg)
            }
            Error::NotFound(what) => Self::not_found(format!("{} not found", what)),
            Error::Storage(e) => {
                tracing::error!(error = %e, "{}", context);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, context)
            }
            Error::Io(e) => {
                tracing::error!(error = %e, "{}", context);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, context)
            }
            Error::Internal(msg) => {
                tracing::error!(error = %msg, "{}", context);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, context)
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::with_context(err, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(MessageResponse::new(self.message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (Error::Acquisition("offline".into()), StatusCode::BAD_REQUEST),
            (Error::NotFound("tag".into()), StatusCode::NOT_FOUND),
            (Error::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                Error::Storage(rusqlite::Error::InvalidQuery),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_storage_details_hidden() {
        let err = ApiError::with_context(
            Error::Storage(rusqlite::Error::InvalidQuery),
            "Failed to create collection",
        );
        assert_eq!(err.message(), "Failed to create collection");
    }

    #[test]
    fn test_not_found_message() {
        let err = ApiError::from(Error::NotFound("collection 'c1'".into()));
        assert_eq!(err.message(), "collection 'c1' not found");
    }
}
