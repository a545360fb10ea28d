//! Events: lifecycle notifications and light state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::EntityId;
use crate::light::LightState;

/// UTC timestamp used for event times and `last_changed`.
pub type Timestamp = DateTime<Utc>;

/// Current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Event type under which lifecycle notifications are published.
pub const EVENT_NAME_CHANGE: &str = "animated_scenes_change";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// The recurring loop was scheduled.
    Started,
    /// Every light was released and the animation deregistered.
    Stopped,
}

/// An animation started or stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationEvent {
    pub animation: String,
    pub state: LifecycleState,
    pub timestamp: Timestamp,
}

impl AnimationEvent {
    #[must_use]
    pub fn new(animation: impl Into<String>, state: LifecycleState) -> Self {
        Self {
            animation: animation.into(),
            state,
            timestamp: now(),
        }
    }

    #[must_use]
    pub fn started(animation: impl Into<String>) -> Self {
        Self::new(animation, LifecycleState::Started)
    }

    #[must_use]
    pub fn stopped(animation: impl Into<String>) -> Self {
        Self::new(animation, LifecycleState::Stopped)
    }
}

/// Who caused a state change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    /// A service call issued through the light platform port.
    Engine,
    /// Anything else: a wall switch, another controller, a user.
    #[default]
    External,
}

/// A tracked entity changed state on the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub entity_id: EntityId,
    pub old_state: Option<LightState>,
    pub new_state: Option<LightState>,
    #[serde(default)]
    pub origin: ChangeOrigin,
}

impl StateChange {
    #[must_use]
    pub fn new(
        entity_id: EntityId,
        old_state: Option<LightState>,
        new_state: Option<LightState>,
        origin: ChangeOrigin,
    ) -> Self {
        Self {
            entity_id,
            old_state,
            new_state,
            origin,
        }
    }

    /// An off → on transition nobody in this process asked for.
    #[must_use]
    pub fn is_external_turn_on(&self) -> bool {
        self.origin == ChangeOrigin::External && self.is_turn_on()
    }

    /// Whether this change is an off → on transition.
    #[must_use]
    pub fn is_turn_on(&self) -> bool {
        matches!(
            (&self.old_state, &self.new_state),
            (Some(old), Some(new)) if old.is_off() && new.is_on()
        )
    }
}
