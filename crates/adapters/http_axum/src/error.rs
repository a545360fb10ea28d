//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use animated_scenes_domain::error::{AnimatedScenesError, NotFoundError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`AnimatedScenesError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(AnimatedScenesError);

impl From<AnimatedScenesError> for ApiError {
    fn from(err: AnimatedScenesError) -> Self {
        Self(err)
    }
}

impl From<NotFoundError> for ApiError {
    fn from(err: NotFoundError) -> Self {
        Self(err.into())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AnimatedScenesError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AnimatedScenesError::Color(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AnimatedScenesError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            AnimatedScenesError::Platform(err) => {
                tracing::error!(error = %err, "platform error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
