//! Scene switches: stored scene configurations that start and stop by toggle.

use std::sync::atomic::{AtomicBool, Ordering};

use animated_scenes_domain::error::{AnimatedScenesError, ValidationError};
use animated_scenes_domain::id::EntityId;
use animated_scenes_domain::light::{AttributeValue, EntityState, LightState};
use animated_scenes_domain::service::StartRequest;

use crate::animations::Animations;
use crate::ports::LightPlatform;

const SWITCH_PREFIX: &str = "animated_scenes_";

/// Lowercase, runs of anything but `[a-z0-9]` collapsed into one `_`,
/// no leading or trailing `_`.
#[must_use]
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// A named scene that can be toggled on and off.
#[derive(Debug)]
pub struct SceneSwitch {
    entity_id: EntityId,
    config: StartRequest,
    is_on: AtomicBool,
}

impl SceneSwitch {
    /// # Errors
    ///
    /// Returns the [`ValidationError`] of an invalid scene configuration.
    pub fn new(config: StartRequest) -> Result<Self, ValidationError> {
        config.validate()?;
        let entity_id = EntityId::new(format!(
            "switch.{}",
            slugify(&format!("{SWITCH_PREFIX}{}", config.name))
        ))?;
        Ok(Self {
            entity_id,
            config,
            is_on: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// Scene name, also the switch's friendly name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.is_on.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn config(&self) -> &StartRequest {
        &self.config
    }

    /// The stored configuration minus its name.
    #[must_use]
    pub fn attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut attributes = match serde_json::to_value(&self.config) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        attributes.remove("name");
        attributes
    }

    /// The switch as a host entity, so the host can resolve it by
    /// `friendly_name`.
    #[must_use]
    pub fn entity_state(&self) -> LightState {
        let state = if self.is_on() {
            EntityState::On
        } else {
            EntityState::Off
        };
        self.attributes().into_iter().fold(
            LightState::new(self.entity_id.clone(), state)
                .with_attribute("friendly_name", self.name()),
            |entity, (key, value)| entity.with_attribute(key, AttributeValue::from(value)),
        )
    }

    /// Start the scene unless the switch is already on.
    ///
    /// # Errors
    ///
    /// Returns the error of [`Animations::start`]; the switch stays off.
    pub async fn turn_on<P: LightPlatform>(
        &self,
        animations: &Animations<P>,
    ) -> Result<(), AnimatedScenesError> {
        if self.is_on() {
            return Ok(());
        }
        animations.start(self.config.clone()).await?;
        self.is_on.store(true, Ordering::SeqCst);
        tracing::info!(switch = %self.entity_id, "scene switched on");
        Ok(())
    }

    pub async fn turn_off<P: LightPlatform>(&self, animations: &Animations<P>) {
        self.is_on.store(false, Ordering::SeqCst);
        animations.stop(self.name()).await;
        tracing::info!(switch = %self.entity_id, "scene switched off");
    }
}

/// The configured scene switches, looked up by entity id.
#[derive(Debug, Default)]
pub struct SceneSwitches {
    switches: Vec<SceneSwitch>,
}

impl SceneSwitches {
    #[must_use]
    pub fn new(switches: Vec<SceneSwitch>) -> Self {
        Self { switches }
    }

    #[must_use]
    pub fn get(&self, entity_id: &EntityId) -> Option<&SceneSwitch> {
        self.switches
            .iter()
            .find(|switch| switch.entity_id() == entity_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneSwitch> {
        self.switches.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.switches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }
}
