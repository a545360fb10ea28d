//! Activity summary.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use animated_scenes_app::ports::LightPlatform;
use animated_scenes_app::services::animation_service::ActiveSensor;

use crate::state::AppState;

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<ActiveSensor>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/animations`: the activity sensor: count plus the registered
/// animations sorted by name.
pub async fn list<P: LightPlatform>(State(state): State<AppState<P>>) -> ListResponse {
    ListResponse::Ok(Json(state.animation_service.active_sensor()))
}
