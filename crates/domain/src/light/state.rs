//! On/off state and the color mode a light reports.

use serde::{Deserialize, Serialize};

/// Discrete operational state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    On,
    Off,
    #[default]
    Unknown,
    Unavailable,
}

impl EntityState {
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    #[must_use]
    pub fn is_off(self) -> bool {
        matches!(self, Self::Off)
    }
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
            Self::Unknown => f.write_str("unknown"),
            Self::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// How a light is currently producing its color (`color_mode` attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Onoff,
    Brightness,
    ColorTemp,
    Hs,
    Xy,
    Rgb,
    Rgbw,
    Rgbww,
    White,
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_unknown() {
        assert_eq!(EntityState::default(), EntityState::Unknown);
        assert!(!EntityState::Unknown.is_on());
        assert!(!EntityState::Unknown.is_off());
    }

    #[test]
    fn should_display_lowercase_variant_name() {
        assert_eq!(EntityState::On.to_string(), "on");
        assert_eq!(EntityState::Unavailable.to_string(), "unavailable");
    }

    #[test]
    fn should_parse_color_mode_names() {
        let mode: ColorMode = serde_json::from_str("\"color_temp\"").unwrap();
        assert_eq!(mode, ColorMode::ColorTemp);
        let mode: ColorMode = serde_json::from_str("\"onoff\"").unwrap();
        assert_eq!(mode, ColorMode::Onoff);
    }
}
