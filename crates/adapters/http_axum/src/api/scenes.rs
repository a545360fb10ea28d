//! JSON handlers for scene switches.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use animated_scenes_app::ports::LightPlatform;
use animated_scenes_app::services::scene_switch::SceneSwitch;
use animated_scenes_domain::error::NotFoundError;
use animated_scenes_domain::id::EntityId;

use crate::error::ApiError;
use crate::state::AppState;

/// A scene switch as reported to clients.
#[derive(Debug, Serialize)]
pub struct SceneView {
    pub entity_id: EntityId,
    pub name: String,
    pub is_on: bool,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl From<&SceneSwitch> for SceneView {
    fn from(switch: &SceneSwitch) -> Self {
        Self {
            entity_id: switch.entity_id().clone(),
            name: switch.name().to_string(),
            is_on: switch.is_on(),
            attributes: switch.attributes(),
        }
    }
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<SceneView>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the single-switch endpoints.
pub enum GetResponse {
    Ok(Json<SceneView>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

fn find<'a, P>(state: &'a AppState<P>, raw: &str) -> Result<&'a SceneSwitch, ApiError> {
    let entity_id = EntityId::from_str(raw)?;
    state.scene_switches.get(&entity_id).ok_or_else(|| {
        ApiError::from(NotFoundError {
            entity: "Scene switch",
            id: entity_id.to_string(),
        })
    })
}

/// `GET /api/scenes`
pub async fn list<P: LightPlatform>(State(state): State<AppState<P>>) -> ListResponse {
    ListResponse::Ok(Json(
        state.scene_switches.iter().map(SceneView::from).collect(),
    ))
}

/// `GET /api/scenes/{entity_id}`
pub async fn get<P: LightPlatform>(
    State(state): State<AppState<P>>,
    Path(entity_id): Path<String>,
) -> Result<GetResponse, ApiError> {
    let switch = find(&state, &entity_id)?;
    Ok(GetResponse::Ok(Json(SceneView::from(switch))))
}

/// `POST /api/scenes/{entity_id}/turn_on`
pub async fn turn_on<P: LightPlatform>(
    State(state): State<AppState<P>>,
    Path(entity_id): Path<String>,
) -> Result<GetResponse, ApiError> {
    let switch = find(&state, &entity_id)?;
    switch
        .turn_on(state.animation_service.animations())
        .await?;
    Ok(GetResponse::Ok(Json(SceneView::from(switch))))
}

/// `POST /api/scenes/{entity_id}/turn_off`
pub async fn turn_off<P: LightPlatform>(
    State(state): State<AppState<P>>,
    Path(entity_id): Path<String>,
) -> Result<GetResponse, ApiError> {
    let switch = find(&state, &entity_id)?;
    switch
        .turn_off(state.animation_service.animations())
        .await;
    Ok(GetResponse::Ok(Json(SceneView::from(switch))))
}
