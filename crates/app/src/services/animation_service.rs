//! Animation service: the four `animated_scenes.*` service handlers.
//!
//! Service data arrives as raw JSON, is validated into a typed request before
//! anything is touched, and is handed to the [`Animations`] registry.

use serde::Serialize;
use tracing::instrument;

use animated_scenes_domain::error::{AnimatedScenesError, NotFoundError};
use animated_scenes_domain::service::{
    AddLightsRequest, RemoveLightsRequest, StartRequest, StopRequest,
};

use crate::animations::{ActiveAnimation, Animations};
use crate::ports::LightPlatform;

/// Service domain the handlers are registered under.
pub const DOMAIN: &str = "animated_scenes";
pub const START_ANIMATION: &str = "start_animation";
pub const STOP_ANIMATION: &str = "stop_animation";
pub const ADD_LIGHTS_TO_ANIMATION: &str = "add_lights_to_animation";
pub const REMOVE_LIGHTS: &str = "remove_lights";

/// Every service name [`AnimationService::call`] dispatches.
pub const SERVICES: [&str; 4] = [
    START_ANIMATION,
    STOP_ANIMATION,
    ADD_LIGHTS_TO_ANIMATION,
    REMOVE_LIGHTS,
];

/// Entity id of the activity sensor.
pub const ACTIVE_SENSOR_ENTITY_ID: &str = "sensor.animated_scenes_active";

/// State of the activity sensor: the number of registered animations, with
/// the animations themselves as attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSensor {
    pub entity_id: &'static str,
    pub state: usize,
    pub animations: Vec<ActiveAnimation>,
}

/// Application service for the `animated_scenes` service calls.
pub struct AnimationService<P> {
    animations: Animations<P>,
}

impl<P> Clone for AnimationService<P> {
    fn clone(&self) -> Self {
        Self {
            animations: self.animations.clone(),
        }
    }
}

impl<P: LightPlatform> AnimationService<P> {
    /// Create a new service driving the given registry.
    pub fn new(animations: Animations<P>) -> Self {
        Self { animations }
    }

    #[must_use]
    pub fn animations(&self) -> &Animations<P> {
        &self.animations
    }

    /// Dispatch `service` with its raw data.
    ///
    /// # Errors
    ///
    /// Returns [`AnimatedScenesError::NotFound`] for an unknown service name,
    /// otherwise whatever the handler returns.
    pub async fn call(
        &self,
        service: &str,
        data: serde_json::Value,
    ) -> Result<(), AnimatedScenesError> {
        match service {
            START_ANIMATION => self.start_animation(data).await,
            STOP_ANIMATION => self.stop_animation(data).await,
            ADD_LIGHTS_TO_ANIMATION => self.add_lights_to_animation(data).await,
            REMOVE_LIGHTS => self.remove_lights(data).await,
            other => Err(NotFoundError {
                entity: "Service",
                id: format!("{DOMAIN}.{other}"),
            }
            .into()),
        }
    }

    /// # Errors
    ///
    /// Returns [`AnimatedScenesError::Validation`] when `data` does not
    /// describe a valid animation.
    #[instrument(skip(self, data))]
    pub async fn start_animation(&self, data: serde_json::Value) -> Result<(), AnimatedScenesError> {
        let request = StartRequest::from_value(data)?;
        tracing::info!(
            animation = %request.name,
            lights = request.lights.len(),
            colors = request.colors.len(),
            "starting animation"
        );
        self.animations.start(request).await
    }

    /// # Errors
    ///
    /// Returns [`AnimatedScenesError::Validation`] when `data` carries no name.
    #[instrument(skip(self, data))]
    pub async fn stop_animation(&self, data: serde_json::Value) -> Result<(), AnimatedScenesError> {
        let request = StopRequest::from_value(data)?;
        tracing::info!(animation = %request.name, "stopping animation");
        self.animations.stop(&request.name).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`AnimatedScenesError::Validation`] for malformed data or an
    /// ambiguous target, [`AnimatedScenesError::NotFound`] when the target
    /// animation is not running.
    #[instrument(skip(self, data))]
    pub async fn add_lights_to_animation(
        &self,
        data: serde_json::Value,
    ) -> Result<(), AnimatedScenesError> {
        let request = AddLightsRequest::from_value(data)?;
        tracing::info!(lights = request.lights.len(), "adding lights to animation");
        self.animations.add_lights_to_animation(request).await
    }

    /// # Errors
    ///
    /// Returns [`AnimatedScenesError::Validation`] for malformed data.
    #[instrument(skip(self, data))]
    pub async fn remove_lights(&self, data: serde_json::Value) -> Result<(), AnimatedScenesError> {
        let request = RemoveLightsRequest::from_value(data)?;
        tracing::info!(
            lights = request.lights.len(),
            skip_restore = request.skip_restore,
            "removing lights from animations"
        );
        self.animations.remove_lights(request).await;
        Ok(())
    }

    #[must_use]
    pub fn active_sensor(&self) -> ActiveSensor {
        let animations = self.animations.active();
        ActiveSensor {
            entity_id: ACTIVE_SENSOR_ENTITY_ID,
            state: animations.len(),
            animations,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{MockPlatform, id};
    use animated_scenes_domain::error::ValidationError;
    use animated_scenes_domain::light::EntityState;

    fn service() -> (Arc<MockPlatform>, AnimationService<Arc<MockPlatform>>) {
        let platform = MockPlatform::with_lights(&[
            ("light.kitchen", EntityState::On),
            ("light.porch", EntityState::On),
        ]);
        let animations = Animations::with_seed(Arc::clone(&platform), 5);
        (platform, AnimationService::new(animations))
    }

    #[tokio::test(start_paused = true)]
    async fn should_start_and_report_animation() {
        let (_platform, service) = service();
        service
            .call(
                START_ANIMATION,
                serde_json::json!({
                    "name": "Party",
                    "lights": "light.kitchen, light.porch",
                    "change_frequency": 5,
                    "colors": [{"color_type": "rgb_color", "color": [255, 0, 0]}]
                }),
            )
            .await
            .unwrap();

        let sensor = service.active_sensor();
        assert_eq!(sensor.entity_id, ACTIVE_SENSOR_ENTITY_ID);
        assert_eq!(sensor.state, 1);
        assert_eq!(sensor.animations[0].name, "Party");
        assert_eq!(
            sensor.animations[0].lights,
            vec![id("light.kitchen"), id("light.porch")]
        );

        service
            .call(STOP_ANIMATION, serde_json::json!({"name": "Party"}))
            .await
            .unwrap();
        assert_eq!(service.active_sensor().state, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_reject_invalid_data_before_touching_lights() {
        let (platform, service) = service();
        let result = service
            .start_animation(serde_json::json!({
                "name": "Party",
                "lights": ["light.kitchen"],
                "brightness": 300
            }))
            .await;

        assert!(matches!(result, Err(AnimatedScenesError::Validation(_))));
        assert!(platform.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_reject_add_lights_with_both_targets() {
        let (_platform, service) = service();
        let result = service
            .add_lights_to_animation(serde_json::json!({
                "name": "Party",
                "animated_scene_switch": "switch.animated_scenes_party",
                "lights": ["light.porch"]
            }))
            .await;

        assert!(matches!(
            result,
            Err(AnimatedScenesError::Validation(ValidationError::AmbiguousTarget))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_unknown_animation_when_adding_lights() {
        let (_platform, service) = service();
        let result = service
            .call(
                ADD_LIGHTS_TO_ANIMATION,
                serde_json::json!({"name": "Ghost", "lights": ["light.porch"]}),
            )
            .await;
        assert!(matches!(result, Err(AnimatedScenesError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn should_remove_lights_through_service_data() {
        let (platform, service) = service();
        service
            .start_animation(serde_json::json!({
                "name": "Party",
                "lights": ["light.kitchen"],
                "change_frequency": [1, 3]
            }))
            .await
            .unwrap();
        platform.clear_calls();

        service
            .call(REMOVE_LIGHTS, serde_json::json!({"lights": "light.kitchen"}))
            .await
            .unwrap();

        assert_eq!(service.active_sensor().state, 0);
        assert_eq!(platform.calls_for("light.kitchen").len(), 1);
    }

    #[tokio::test]
    async fn should_reject_unknown_service() {
        let (_platform, service) = service();
        let err = service
            .call("toggle_animation", serde_json::json!({}))
            .await
            .unwrap_err();
        match err {
            AnimatedScenesError::NotFound(not_found) => {
                assert_eq!(not_found.entity, "Service");
                assert_eq!(not_found.id, "animated_scenes.toggle_animation");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
