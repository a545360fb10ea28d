//! Virtual switch: a scene switch published as a host entity.

use animated_scenes_domain::event::now;
use animated_scenes_domain::light::{EntityState, LightState};

/// A switch entity whose attributes are provided by its owner.
#[derive(Debug, Clone)]
pub struct VirtualSwitch {
    state: LightState,
}

impl VirtualSwitch {
    #[must_use]
    pub fn new(state: LightState) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn state(&self) -> &LightState {
        &self.state
    }

    /// Replace the published attributes and on/off state.
    pub fn update(&mut self, state: LightState) {
        self.state.attributes = state.attributes;
        if self.state.state != state.state {
            self.state.state = state.state;
            self.state.last_changed = now();
        }
    }

    pub fn set_state(&mut self, state: EntityState) -> LightState {
        if self.state.state != state {
            self.state.state = state;
            self.state.last_changed = now();
        }
        self.state.clone()
    }
}
