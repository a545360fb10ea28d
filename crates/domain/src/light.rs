//! Light state as reported by the host.
//!
//! A [`LightState`] is both what the engine reads before deciding whether a
//! light is eligible and the snapshot it replays when handing a light back.

mod attribute_value;
mod state;

use std::collections::HashMap;

pub use attribute_value::AttributeValue;
use serde::{Deserialize, Serialize};
pub use state::{ColorMode, EntityState};

use crate::color::{ColorType, ColorValue};
use crate::command::LightCommand;
use crate::event::Timestamp;
use crate::id::EntityId;

/// Transition used when replaying a snapshot, in seconds.
pub const RESTORE_TRANSITION: f64 = 1.0;

/// Attributes checked, in order, when a snapshot carries no `color_mode`.
const RESTORE_COLOR_FALLBACK: [ColorType; 7] = [
    ColorType::RgbColor,
    ColorType::RgbwColor,
    ColorType::RgbwwColor,
    ColorType::XyColor,
    ColorType::HsColor,
    ColorType::ColorTemp,
    ColorType::ColorTempKelvin,
];

/// State of one light entity at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightState {
    pub entity_id: EntityId,
    pub state: EntityState,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeValue>,
    pub last_changed: Timestamp,
}

impl LightState {
    #[must_use]
    pub fn new(entity_id: EntityId, state: EntityState) -> Self {
        Self {
            entity_id,
            state,
            attributes: HashMap::new(),
            last_changed: crate::event::now(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.state.is_on()
    }

    #[must_use]
    pub fn is_off(&self) -> bool {
        self.state.is_off()
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    #[must_use]
    pub fn friendly_name(&self) -> Option<&str> {
        self.attribute("friendly_name").and_then(AttributeValue::as_str)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn brightness(&self) -> Option<u8> {
        self.attribute("brightness")
            .and_then(AttributeValue::as_f64)
            .map(|b| b.round().clamp(0.0, 255.0) as u8)
    }

    #[must_use]
    pub fn color_mode(&self) -> Option<ColorMode> {
        let raw = self.attribute("color_mode")?.to_json();
        serde_json::from_value(raw).ok()
    }

    /// The color attribute for `color_type`, when present and well-formed.
    #[must_use]
    pub fn color(&self, color_type: ColorType) -> Option<ColorValue> {
        let raw = self.attribute(color_type.attribute())?.to_json();
        match color_type {
            ColorType::RgbColor => serde_json::from_value(raw).ok().map(ColorValue::Rgb),
            ColorType::RgbwColor => serde_json::from_value(raw).ok().map(ColorValue::Rgbw),
            ColorType::RgbwwColor => serde_json::from_value(raw).ok().map(ColorValue::Rgbww),
            ColorType::HsColor => serde_json::from_value::<[f64; 2]>(raw)
                .ok()
                .map(|[h, s]| ColorValue::Hs(h, s)),
            ColorType::XyColor => serde_json::from_value::<[f64; 2]>(raw)
                .ok()
                .map(|[x, y]| ColorValue::Xy(x, y)),
            ColorType::ColorTempKelvin => serde_json::from_value(raw)
                .ok()
                .map(ColorValue::ColorTempKelvin),
            ColorType::ColorTemp => serde_json::from_value(raw)
                .ok()
                .map(ColorValue::ColorTempMireds),
        }
    }

    fn present_color(&self, color_type: ColorType) -> Option<ColorValue> {
        self.attribute(color_type.attribute())
            .filter(|value| value.is_truthy())
            .and_then(|_| self.color(color_type))
    }

    /// Build the `light.turn_on` payload that reproduces this snapshot.
    ///
    /// Brightness is copied, the transition is [`RESTORE_TRANSITION`] and
    /// the color attribute is picked from `color_mode`. Without a color mode
    /// the first present color attribute wins.
    #[must_use]
    pub fn restore_command(&self) -> LightCommand {
        let mut command =
            LightCommand::new(self.entity_id.clone()).with_transition(RESTORE_TRANSITION);
        command.brightness = self.brightness();

        let color = match self.color_mode() {
            Some(ColorMode::Xy) => self.color(ColorType::XyColor),
            Some(ColorMode::Hs) => self.color(ColorType::HsColor),
            Some(ColorMode::Rgb) => self.color(ColorType::RgbColor),
            Some(ColorMode::Rgbw) => self.color(ColorType::RgbwColor),
            Some(ColorMode::Rgbww) => self.color(ColorType::RgbwwColor),
            Some(ColorMode::ColorTemp) => self
                .color(ColorType::ColorTempKelvin)
                .or_else(|| self.color(ColorType::ColorTemp)),
            Some(ColorMode::White) => {
                command.color_mode = Some(ColorMode::White);
                None
            }
            Some(ColorMode::Onoff | ColorMode::Brightness | ColorMode::Unknown) => None,
            None => RESTORE_COLOR_FALLBACK
                .iter()
                .find_map(|color_type| self.present_color(*color_type)),
        };
        if let Some(color) = color {
            command = command.with_color(color);
        }
        command
    }
}

impl From<u8> for AttributeValue {
    fn from(value: u8) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}
