//! Application-level error type returned by handlers.
//!
//! All variants serialise to the failure [`Envelope`] and map to the
//! appropriate HTTP status code. Domain messages pass through unchanged.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hearth::{GraphError, ValidationError};
use hearth_api::Envelope;

use crate::storage::StorageError;

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    /// Malformed input, failed validation, or a refused state transition.
    BadRequest(String),
    /// Missing or invalid signature, or the caller does not own the resource.
    Unauthorized(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
            }
        };
        (status, Json(Envelope::error(message))).into_response()
    }
}

impl From<GraphError> for AppError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::NotFound(msg) => AppError::NotFound(msg),
            GraphError::InvalidOperation(msg) | GraphError::Conflict(msg) => {
                AppError::BadRequest(msg)
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => AppError::NotFound("not found".into()),
            StorageError::Conflict(msg) => AppError::BadRequest(msg),
            StorageError::Rejected(e) => e.into(),
            StorageError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_errors_map_to_status_codes() {
        let cases = [
            (GraphError::NotFound("User not found".into()), StatusCode::NOT_FOUND),
            (
                GraphError::InvalidOperation("No friend request from this user".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GraphError::Conflict("Friend request already sent".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            let resp = AppError::from(StorageError::Rejected(err)).into_response();
            assert_eq!(resp.status(), status);
        }
    }

    #[test]
    fn internal_detail_is_not_leaked() {
        let err: AppError = StorageError::Internal("disk on fire".into()).into();
        match &err {
            AppError::Internal(msg) => assert_eq!(msg, "disk on fire"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
