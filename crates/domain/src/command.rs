//! Light service calls issued by the engine.
//!
//! Every write to a light is a [`ServiceCall`] on the `light` domain. The
//! payload serialises to the service data a host receives, e.g.
//! `{"entity_id": "light.kitchen", "transition": 1.0, "rgb_color": [255, 0, 0]}`.

use serde::{Deserialize, Serialize};

use crate::color::ColorValue;
use crate::id::EntityId;
use crate::light::ColorMode;

/// Domain every engine call targets.
pub const LIGHT_DOMAIN: &str = "light";

/// Services the engine invokes on lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightService {
    TurnOn,
    TurnOff,
}

impl LightService {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TurnOn => "turn_on",
            Self::TurnOff => "turn_off",
        }
    }
}

impl std::fmt::Display for LightService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A call to `light.<service>` with its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub service: LightService,
    pub data: LightCommand,
}

impl ServiceCall {
    #[must_use]
    pub fn turn_on(data: LightCommand) -> Self {
        Self {
            service: LightService::TurnOn,
            data,
        }
    }

    #[must_use]
    pub fn turn_off(entity_id: EntityId) -> Self {
        Self {
            service: LightService::TurnOff,
            data: LightCommand::new(entity_id),
        }
    }

    #[must_use]
    pub fn domain(&self) -> &'static str {
        LIGHT_DOMAIN
    }

    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        &self.data.entity_id
    }
}

impl std::fmt::Display for ServiceCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{LIGHT_DOMAIN}.{}({})", self.service, self.data.entity_id)
    }
}

/// Service data for a light call.
///
/// At most one color attribute is set; [`with_color`](Self::with_color)
/// clears the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightCommand {
    pub entity_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb_color: Option<[u8; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgbw_color: Option<[u8; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgbww_color: Option<[u8; 5]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hs_color: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xy_color: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_temp_kelvin: Option<u32>,
    /// Legacy mireds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_temp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_mode: Option<ColorMode>,
}

impl LightCommand {
    #[must_use]
    pub fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            transition: None,
            brightness: None,
            rgb_color: None,
            rgbw_color: None,
            rgbww_color: None,
            hs_color: None,
            xy_color: None,
            color_temp_kelvin: None,
            color_temp: None,
            color_mode: None,
        }
    }

    #[must_use]
    pub fn with_transition(mut self, seconds: f64) -> Self {
        self.transition = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = Some(brightness);
        self
    }

    /// Set the color attribute matching `color`, clearing any other one.
    #[must_use]
    pub fn with_color(mut self, color: ColorValue) -> Self {
        self.clear_color();
        match color {
            ColorValue::Rgb(rgb) => self.rgb_color = Some(rgb),
            ColorValue::Rgbw(rgbw) => self.rgbw_color = Some(rgbw),
            ColorValue::Rgbww(rgbww) => self.rgbww_color = Some(rgbww),
            ColorValue::Hs(h, s) => self.hs_color = Some([h, s]),
            ColorValue::Xy(x, y) => self.xy_color = Some([x, y]),
            ColorValue::ColorTempKelvin(kelvin) => self.color_temp_kelvin = Some(kelvin),
            ColorValue::ColorTempMireds(mireds) => self.color_temp = Some(mireds),
        }
        self
    }

    fn clear_color(&mut self) {
        self.rgb_color = None;
        self.rgbw_color = None;
        self.rgbww_color = None;
        self.hs_color = None;
        self.xy_color = None;
        self.color_temp_kelvin = None;
        self.color_temp = None;
        self.color_mode = None;
    }

    /// The color attribute carried by this command, if any.
    #[must_use]
    pub fn color(&self) -> Option<ColorValue> {
        self.rgb_color
            .map(ColorValue::Rgb)
            .or(self.rgbw_color.map(ColorValue::Rgbw))
            .or(self.rgbww_color.map(ColorValue::Rgbww))
            .or(self.hs_color.map(|[h, s]| ColorValue::Hs(h, s)))
            .or(self.xy_color.map(|[x, y]| ColorValue::Xy(x, y)))
            .or(self.color_temp_kelvin.map(ColorValue::ColorTempKelvin))
            .or(self.color_temp.map(ColorValue::ColorTempMireds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kitchen() -> EntityId {
        EntityId::new("light.kitchen").unwrap()
    }

    #[test]
    fn should_serialize_only_present_fields() {
        let command = LightCommand::new(kitchen())
            .with_transition(2.5)
            .with_brightness(80)
            .with_color(ColorValue::Rgb([255, 0, 0]));
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            serde_json::json!({
                "entity_id": "light.kitchen",
                "transition": 2.5,
                "brightness": 80,
                "rgb_color": [255, 0, 0]
            })
        );
    }

    #[test]
    fn should_keep_a_single_color_attribute() {
        let command = LightCommand::new(kitchen())
            .with_color(ColorValue::Rgb([1, 2, 3]))
            .with_color(ColorValue::ColorTempKelvin(3000));
        assert_eq!(command.rgb_color, None);
        assert_eq!(command.color(), Some(ColorValue::ColorTempKelvin(3000)));
    }

    #[test]
    fn should_build_turn_off_call_with_entity_only() {
        let call = ServiceCall::turn_off(kitchen());
        assert_eq!(call.service, LightService::TurnOff);
        assert_eq!(call.data, LightCommand::new(kitchen()));
        assert_eq!(call.to_string(), "light.turn_off(light.kitchen)");
    }
}
