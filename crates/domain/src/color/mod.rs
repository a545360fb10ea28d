//! Colors: the representations a light accepts and the math between them.
//!
//! The engine stores each configured color in the representation it was
//! given. Perturbation ("nearby colors") goes through 8-bit RGB and HLS and
//! comes back out in the original representation, see [`find_nearby_color`].

mod convert;
mod nearby;
mod palette;

pub use convert::{
    color_temperature_to_rgb, convert_rgb_to_original_type, convert_to_rgb, hls_to_rgb,
    hs_to_rgb, mireds_to_kelvin, rgb_to_hls, rgb_to_hs, rgb_to_kelvin, rgb_to_rgbw,
    rgb_to_rgbww, rgb_to_xy, rgbw_to_rgb, rgbww_to_rgb, xy_to_rgb,
};
pub use nearby::find_nearby_color;
pub use palette::{ColorSpec, DEFAULT_COLOR_WEIGHT, MAX_NEARBY_RANGE};

use serde::{Deserialize, Serialize};

/// Warmest color temperature the engine produces, in kelvin.
pub const MIN_KELVIN: u32 = 1500;
/// Coolest color temperature the engine produces, in kelvin.
pub const MAX_KELVIN: u32 = 9000;

/// The `color_type` discriminant of a configured color.
///
/// Serialised names match the light service attribute each one maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorType {
    RgbColor,
    RgbwColor,
    RgbwwColor,
    HsColor,
    XyColor,
    /// Legacy mireds. Converted to kelvin before an animation uses it.
    ColorTemp,
    ColorTempKelvin,
}

impl ColorType {
    /// Attribute name in a `light.turn_on` payload.
    #[must_use]
    pub fn attribute(self) -> &'static str {
        match self {
            Self::RgbColor => "rgb_color",
            Self::RgbwColor => "rgbw_color",
            Self::RgbwwColor => "rgbww_color",
            Self::HsColor => "hs_color",
            Self::XyColor => "xy_color",
            Self::ColorTemp => "color_temp",
            Self::ColorTempKelvin => "color_temp_kelvin",
        }
    }
}

impl std::fmt::Display for ColorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.attribute())
    }
}

/// A color value, tagged by representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorValue {
    Rgb([u8; 3]),
    Rgbw([u8; 4]),
    Rgbww([u8; 5]),
    /// Hue in `0..=360`, saturation in `0..=100`.
    Hs(f64, f64),
    /// CIE 1931 chromaticity, both in `0..=1`.
    Xy(f64, f64),
    ColorTempKelvin(u32),
    ColorTempMireds(i64),
}

impl ColorValue {
    #[must_use]
    pub fn color_type(&self) -> ColorType {
        match self {
            Self::Rgb(_) => ColorType::RgbColor,
            Self::Rgbw(_) => ColorType::RgbwColor,
            Self::Rgbww(_) => ColorType::RgbwwColor,
            Self::Hs(..) => ColorType::HsColor,
            Self::Xy(..) => ColorType::XyColor,
            Self::ColorTempKelvin(_) => ColorType::ColorTempKelvin,
            Self::ColorTempMireds(_) => ColorType::ColorTemp,
        }
    }

    /// The value as it appears in service data (`[r, g, b]`, `4000`, ...).
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Rgb(rgb) => serde_json::json!(rgb),
            Self::Rgbw(rgbw) => serde_json::json!(rgbw),
            Self::Rgbww(rgbww) => serde_json::json!(rgbww),
            Self::Hs(h, s) => serde_json::json!([h, s]),
            Self::Xy(x, y) => serde_json::json!([x, y]),
            Self::ColorTempKelvin(kelvin) => serde_json::json!(kelvin),
            Self::ColorTempMireds(mireds) => serde_json::json!(mireds),
        }
    }

    /// Replace legacy mireds with kelvin; other values are returned as is.
    ///
    /// # Errors
    ///
    /// Returns [`ColorError::InvalidMireds`](crate::error::ColorError::InvalidMireds)
    /// for non-positive mireds.
    pub fn normalized(self) -> Result<Self, crate::error::ColorError> {
        match self {
            Self::ColorTempMireds(mireds) => Ok(Self::ColorTempKelvin(mireds_to_kelvin(mireds)?)),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ColorError;

    #[test]
    fn should_name_attribute_after_color_type() {
        assert_eq!(ColorType::RgbwwColor.attribute(), "rgbww_color");
        assert_eq!(ColorType::ColorTemp.to_string(), "color_temp");
    }

    #[test]
    fn should_deserialize_color_type_from_attribute_name() {
        let parsed: ColorType = serde_json::from_str("\"color_temp_kelvin\"").unwrap();
        assert_eq!(parsed, ColorType::ColorTempKelvin);
        assert!(serde_json::from_str::<ColorType>("\"cmyk_color\"").is_err());
    }

    #[test]
    fn should_render_values_as_service_data() {
        assert_eq!(
            ColorValue::Rgb([1, 2, 3]).to_json(),
            serde_json::json!([1, 2, 3])
        );
        assert_eq!(
            ColorValue::ColorTempKelvin(2700).to_json(),
            serde_json::json!(2700)
        );
    }

    #[test]
    fn should_normalize_mireds_into_kelvin() {
        assert_eq!(
            ColorValue::ColorTempMireds(250).normalized(),
            Ok(ColorValue::ColorTempKelvin(4000))
        );
        assert_eq!(
            ColorValue::ColorTempMireds(0).normalized(),
            Err(ColorError::InvalidMireds(0))
        );
        assert_eq!(
            ColorValue::Hs(10.0, 20.0).normalized(),
            Ok(ColorValue::Hs(10.0, 20.0))
        );
    }
}
