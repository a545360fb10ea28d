//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod animations;
#[allow(clippy::missing_errors_doc)]
pub mod scenes;
#[allow(clippy::missing_errors_doc)]
pub mod services;
pub mod sse;

use axum::Router;
use axum::routing::{get, post};

use animated_scenes_app::ports::LightPlatform;

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<P: LightPlatform>() -> Router<AppState<P>> {
    Router::new()
        // Services
        .route("/services/{service}", post(services::call::<P>))
        // Activity
        .route("/animations", get(animations::list::<P>))
        // Scene switches
        .route("/scenes", get(scenes::list::<P>))
        .route("/scenes/{entity_id}", get(scenes::get::<P>))
        .route("/scenes/{entity_id}/turn_on", post(scenes::turn_on::<P>))
        .route("/scenes/{entity_id}/turn_off", post(scenes::turn_off::<P>))
        // Lifecycle events
        .route("/events", get(sse::stream::<P>))
}
