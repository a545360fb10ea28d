//! Configured colors.

use serde::{Deserialize, Serialize};

use super::{ColorType, ColorValue};
use crate::error::{ColorError, ValidationError};
use crate::value::ValueOrRange;

/// Weight of a color that does not set one.
pub const DEFAULT_COLOR_WEIGHT: u8 = 10;
/// Largest accepted `nearby_colors` magnitude.
pub const MAX_NEARBY_RANGE: u8 = 10;

/// One entry of an animation's color list.
///
/// In service data this is
/// `{"color_type": "rgb_color", "color": [255, 0, 0], "weight": 5, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawColorSpec", into = "RawColorSpec")]
pub struct ColorSpec {
    pub value: ColorValue,
    /// Per-color brightness; when `None` the animation brightness applies.
    pub brightness: Option<ValueOrRange<u8>>,
    /// Relative chance of being picked in weighted mode.
    pub weight: u8,
    /// Alternate between a color change and a pure brightness change.
    pub one_change_per_tick: bool,
    /// Perturbation magnitude in `0..=10`; `0` uses the color verbatim.
    pub nearby_range: u8,
}

impl ColorSpec {
    #[must_use]
    pub fn new(value: ColorValue) -> Self {
        Self {
            value,
            brightness: None,
            weight: DEFAULT_COLOR_WEIGHT,
            one_change_per_tick: false,
            nearby_range: 0,
        }
    }

    #[must_use]
    pub fn with_brightness(mut self, brightness: ValueOrRange<u8>) -> Self {
        self.brightness = Some(brightness);
        self
    }

    #[must_use]
    pub fn with_weight(mut self, weight: u8) -> Self {
        self.weight = weight;
        self
    }

    #[must_use]
    pub fn with_one_change_per_tick(mut self, enabled: bool) -> Self {
        self.one_change_per_tick = enabled;
        self
    }

    #[must_use]
    pub fn with_nearby_range(mut self, range: u8) -> Self {
        self.nearby_range = range.min(MAX_NEARBY_RANGE);
        self
    }

    #[must_use]
    pub fn color_type(&self) -> ColorType {
        self.value.color_type()
    }

    /// Same color with legacy mireds turned into kelvin.
    ///
    /// # Errors
    ///
    /// Returns [`ColorError::InvalidMireds`] for non-positive mireds.
    pub fn normalized(self) -> Result<Self, ColorError> {
        Ok(Self {
            value: self.value.normalized()?,
            ..self
        })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawColorSpec {
    color_type: ColorType,
    color: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    brightness: Option<ValueOrRange<u8>>,
    #[serde(default = "default_weight")]
    weight: u64,
    #[serde(default)]
    one_change_per_tick: bool,
    #[serde(default)]
    nearby_colors: u64,
}

fn default_weight() -> u64 {
    u64::from(DEFAULT_COLOR_WEIGHT)
}

impl TryFrom<RawColorSpec> for ColorSpec {
    type Error = ValidationError;

    fn try_from(raw: RawColorSpec) -> Result<Self, Self::Error> {
        let value = parse_color(raw.color_type, raw.color)?;
        if let Some(brightness) = &raw.brightness {
            brightness.validate("brightness", 0, u8::MAX)?;
        }
        let weight = bounded("weight", raw.weight, u8::MAX)?;
        let nearby_range = bounded("nearby_colors", raw.nearby_colors, MAX_NEARBY_RANGE)?;
        Ok(Self {
            value,
            brightness: raw.brightness,
            weight,
            one_change_per_tick: raw.one_change_per_tick,
            nearby_range,
        })
    }
}

impl From<ColorSpec> for RawColorSpec {
    fn from(spec: ColorSpec) -> Self {
        Self {
            color_type: spec.color_type(),
            color: spec.value.to_json(),
            brightness: spec.brightness,
            weight: u64::from(spec.weight),
            one_change_per_tick: spec.one_change_per_tick,
            nearby_colors: u64::from(spec.nearby_range),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn bounded(field: &str, value: u64, max: u8) -> Result<u8, ValidationError> {
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= max)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: field.to_string(),
            value: value as f64,
            min: 0.0,
            max: f64::from(max),
        })
}

fn parse_color(color_type: ColorType, raw: serde_json::Value) -> Result<ColorValue, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidColor {
        color_type: color_type.to_string(),
        reason: reason.to_string(),
    };
    match color_type {
        ColorType::RgbColor => serde_json::from_value(raw)
            .map(ColorValue::Rgb)
            .map_err(|_| invalid("expected 3 integers in 0..=255")),
        ColorType::RgbwColor => serde_json::from_value(raw)
            .map(ColorValue::Rgbw)
            .map_err(|_| invalid("expected 4 integers in 0..=255")),
        ColorType::RgbwwColor => serde_json::from_value(raw)
            .map(ColorValue::Rgbww)
            .map_err(|_| invalid("expected 5 integers in 0..=255")),
        ColorType::XyColor => {
            let [x, y]: [f64; 2] =
                serde_json::from_value(raw).map_err(|_| invalid("expected 2 numbers"))?;
            if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
                return Err(invalid("x and y must be in 0..=1"));
            }
            Ok(ColorValue::Xy(x, y))
        }
        ColorType::HsColor => {
            let [h, s]: [f64; 2] =
                serde_json::from_value(raw).map_err(|_| invalid("expected 2 numbers"))?;
            if !(0.0..=360.0).contains(&h) || !(0.0..=100.0).contains(&s) {
                return Err(invalid("hue must be in 0..=360 and saturation in 0..=100"));
            }
            Ok(ColorValue::Hs(h, s))
        }
        ColorType::ColorTemp => {
            let mireds: i64 = serde_json::from_value(raw)
                .map_err(|_| invalid("expected an integer number of mireds"))?;
            if mireds < 0 {
                return Err(invalid("mireds must not be negative"));
            }
            Ok(ColorValue::ColorTempMireds(mireds))
        }
        ColorType::ColorTempKelvin => {
            let kelvin: u32 = serde_json::from_value(raw)
                .map_err(|_| invalid("expected a positive integer"))?;
            if kelvin == 0 {
                return Err(invalid("expected a positive integer"));
            }
            Ok(ColorValue::ColorTempKelvin(kelvin))
        }
    }
}
