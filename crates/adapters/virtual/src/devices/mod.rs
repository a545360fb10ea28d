//! Virtual device implementations: light and switch.

mod light;
mod switch;

pub use light::VirtualLight;
pub use switch::VirtualSwitch;

use animated_scenes_domain::command::ServiceCall;
use animated_scenes_domain::error::PlatformError;
use animated_scenes_domain::light::{EntityState, LightState};

/// Wrapper enum for the concrete virtual device types.
#[derive(Debug, Clone)]
pub enum VirtualDevice {
    Light(VirtualLight),
    Switch(VirtualSwitch),
}

impl VirtualDevice {
    #[must_use]
    pub fn state(&self) -> &LightState {
        match self {
            Self::Light(d) => d.state(),
            Self::Switch(d) => d.state(),
        }
    }

    /// Apply a `light.*` call.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::UnsupportedService`] for devices that are not
    /// lights.
    pub fn handle_service(&mut self, call: &ServiceCall) -> Result<LightState, PlatformError> {
        match self {
            Self::Light(d) => Ok(d.handle_service(call)),
            Self::Switch(_) => Err(PlatformError::UnsupportedService {
                domain: call.domain().to_string(),
                service: call.service.to_string(),
            }),
        }
    }

    /// Force the on/off state, as a wall switch would.
    pub fn set_state(&mut self, state: EntityState) -> LightState {
        match self {
            Self::Light(d) => d.set_state(state),
            Self::Switch(d) => d.set_state(state),
        }
    }
}
