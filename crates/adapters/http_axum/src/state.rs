//! Shared application state for axum handlers.

use std::sync::Arc;

use animated_scenes_app::ports::LightPlatform;
use animated_scenes_app::services::animation_service::AnimationService;
use animated_scenes_app::services::scene_switch::SceneSwitches;

/// Application state shared across all axum handlers.
///
/// Generic over the light platform to avoid dynamic dispatch. `Clone` is
/// implemented manually so `P` itself does not need to be `Clone`.
pub struct AppState<P> {
    /// Handlers for the `animated_scenes` services.
    pub animation_service: AnimationService<P>,
    /// Configured scene switches.
    pub scene_switches: Arc<SceneSwitches>,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            animation_service: self.animation_service.clone(),
            scene_switches: Arc::clone(&self.scene_switches),
        }
    }
}

impl<P: LightPlatform> AppState<P> {
    /// Accepts the switches by value, or as an `Arc` already shared with
    /// background tasks.
    #[must_use]
    pub fn new(
        animation_service: AnimationService<P>,
        scene_switches: impl Into<Arc<SceneSwitches>>,
    ) -> Self {
        Self {
            animation_service,
            scene_switches: scene_switches.into(),
        }
    }
}
