//! HTTP-facing error type and its response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Handler failures. Display strings double as the `message` field of
/// the JSON error body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("ID not found")]
    NotFound,
    #[error("To create a new task, add a title and a description")]
    InvalidCreate,
    #[error("To create a new task, add a title and/or a description")]
    InvalidUpdate,
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::IdNotFound(_) => Self::NotFound,
            other => Self::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidCreate | Self::InvalidUpdate => StatusCode::BAD_REQUEST,
            Self::Store(error) => {
                // Snapshot failures stay out of the response body.
                tracing::error!(%error, "store failure");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "internal error" })),
                )
                    .into_response();
            }
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn store_not_found_becomes_api_not_found() {
        let error = ApiError::from(StoreError::IdNotFound(Uuid::new_v4()));
        assert!(matches!(error, ApiError::NotFound));
    }

    #[test]
    fn io_failures_stay_internal() {
        let io = std::io::Error::other("disk gone");
        let error = ApiError::from(StoreError::Snapshot(io));
        assert!(matches!(error, ApiError::Store(_)));
    }
}
