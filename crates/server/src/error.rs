//! Unified error handling with Sentry integration.
//!
//! Maps the resolution layer's error taxonomy onto HTTP statuses and
//! captures server-side faults to Sentry before responding. Route handlers
//! return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use trellis_graph::GraphError;

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resolution layer error.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-side faults to Sentry; client errors are expected
        // traffic and only logged at debug level by the resolver.
        if matches!(
            self,
            Self::Internal(_) | Self::Graph(GraphError::DataIntegrity(_) | GraphError::Store(_))
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Graph(GraphError::BadRequest(_)) => StatusCode::BAD_REQUEST,
            Self::Graph(GraphError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Graph(GraphError::ConstraintViolation(_)) => StatusCode::CONFLICT,
            Self::Graph(GraphError::DataIntegrity(_) | GraphError::Store(_))
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Graph(GraphError::DataIntegrity(_) | GraphError::Store(_))
            | Self::Internal(_) => "Internal server error".to_string(),
            Self::Graph(err) => err.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_maps_to_400() {
        let response =
            AppError::Graph(GraphError::BadRequest("nope".to_owned())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_constraint_violation_maps_to_409() {
        let response =
            AppError::Graph(GraphError::ConstraintViolation("dup".to_owned())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_data_integrity_is_hidden_500() {
        let response =
            AppError::Graph(GraphError::DataIntegrity("Post.title".to_owned())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
