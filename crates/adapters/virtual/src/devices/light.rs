//! Virtual light: applies `turn_on` / `turn_off` payloads to its attributes.

use animated_scenes_domain::color::ColorType;
use animated_scenes_domain::command::{LightService, ServiceCall};
use animated_scenes_domain::event::now;
use animated_scenes_domain::id::EntityId;
use animated_scenes_domain::light::{AttributeValue, ColorMode, EntityState, LightState};

const COLOR_ATTRIBUTES: [ColorType; 7] = [
    ColorType::RgbColor,
    ColorType::RgbwColor,
    ColorType::RgbwwColor,
    ColorType::HsColor,
    ColorType::XyColor,
    ColorType::ColorTemp,
    ColorType::ColorTempKelvin,
];

fn color_mode_for(color_type: ColorType) -> ColorMode {
    match color_type {
        ColorType::RgbColor => ColorMode::Rgb,
        ColorType::RgbwColor => ColorMode::Rgbw,
        ColorType::RgbwwColor => ColorMode::Rgbww,
        ColorType::HsColor => ColorMode::Hs,
        ColorType::XyColor => ColorMode::Xy,
        ColorType::ColorTemp | ColorType::ColorTempKelvin => ColorMode::ColorTemp,
    }
}

fn mode_attribute(mode: ColorMode) -> AttributeValue {
    AttributeValue::from(serde_json::to_value(mode).unwrap_or_default())
}

/// A simulated dimmable color light.
#[derive(Debug, Clone)]
pub struct VirtualLight {
    state: LightState,
}

impl VirtualLight {
    #[must_use]
    pub fn new(entity_id: EntityId, friendly_name: &str) -> Self {
        Self {
            state: LightState::new(entity_id, EntityState::Off)
                .with_attribute("friendly_name", friendly_name),
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: EntityState) -> Self {
        self.state.state = state;
        self
    }

    #[must_use]
    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.state
            .attributes
            .insert("brightness".to_string(), AttributeValue::from(brightness));
        self
    }

    #[must_use]
    pub fn state(&self) -> &LightState {
        &self.state
    }

    /// Apply a call and return the resulting state.
    ///
    /// `turn_on` keeps attributes the payload does not mention; a color
    /// replaces the previous color attribute and sets `color_mode`.
    pub fn handle_service(&mut self, call: &ServiceCall) -> LightState {
        match call.service {
            LightService::TurnOff => {
                self.set_state(EntityState::Off);
            }
            LightService::TurnOn => {
                self.set_state(EntityState::On);
                let data = &call.data;
                let attributes = &mut self.state.attributes;
                if let Some(brightness) = data.brightness {
                    attributes.insert("brightness".to_string(), AttributeValue::from(brightness));
                }
                if let Some(color) = data.color() {
                    for color_type in COLOR_ATTRIBUTES {
                        attributes.remove(color_type.attribute());
                    }
                    attributes.insert(
                        color.color_type().attribute().to_string(),
                        AttributeValue::from(color.to_json()),
                    );
                    attributes.insert(
                        "color_mode".to_string(),
                        mode_attribute(color_mode_for(color.color_type())),
                    );
                } else if data.color_mode == Some(ColorMode::White) {
                    attributes.insert("color_mode".to_string(), mode_attribute(ColorMode::White));
                }
            }
        }
        self.state.clone()
    }

    /// Force the on/off state.
    pub fn set_state(&mut self, state: EntityState) -> LightState {
        if self.state.state != state {
            self.state.state = state;
            self.state.last_changed = now();
        }
        self.state.clone()
    }
}
