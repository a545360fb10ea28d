//! `animated_scenes.*` service calls over HTTP.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use animated_scenes_app::ports::LightPlatform;

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the call endpoint.
pub enum CallResponse {
    NoContent,
}

impl IntoResponse for CallResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `POST /api/services/{service}`: body is the raw service data.
pub async fn call<P: LightPlatform>(
    State(state): State<AppState<P>>,
    Path(service): Path<String>,
    Json(data): Json<serde_json::Value>,
) -> Result<CallResponse, ApiError> {
    state.animation_service.call(&service, data).await?;
    Ok(CallResponse::NoContent)
}
