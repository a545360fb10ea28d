//! Validated service requests.
//!
//! Service data arrives as loose JSON. Each request type decodes it with
//! defaults applied and unknown keys rejected, then checks value ranges, so
//! that a malformed call fails before anything is touched.

use serde::{Deserialize, Deserializer, Serialize};

use crate::color::ColorSpec;
use crate::error::ValidationError;
use crate::id::EntityId;
use crate::value::{ChangeAmount, ValueOrRange};

pub const DEFAULT_PRIORITY: i64 = 100;
pub const DEFAULT_BRIGHTNESS: u8 = 255;
pub const DEFAULT_TRANSITION: f64 = 1.0;
pub const MAX_TRANSITION: f64 = 6553.0;
pub const MAX_CHANGE_FREQUENCY: f64 = 60.0;

fn default_true() -> bool {
    true
}

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

fn default_brightness() -> ValueOrRange<u8> {
    ValueOrRange::Fixed(DEFAULT_BRIGHTNESS)
}

fn default_transition() -> ValueOrRange<f64> {
    ValueOrRange::Fixed(DEFAULT_TRANSITION)
}

fn decode<T: for<'de> Deserialize<'de>>(data: serde_json::Value) -> Result<T, ValidationError> {
    serde_json::from_value(data).map_err(|err| ValidationError::Malformed(err.to_string()))
}

/// `start_animation` service data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartRequest {
    pub name: String,
    /// Skip lights that are off.
    #[serde(default = "default_true")]
    pub ignore_off: bool,
    #[serde(default = "default_true")]
    pub restore: bool,
    /// Turn lights back off on restore when they were off.
    #[serde(default = "default_true")]
    pub restore_power: bool,
    #[serde(default = "default_brightness")]
    pub brightness: ValueOrRange<u8>,
    #[serde(default = "default_transition")]
    pub transition: ValueOrRange<f64>,
    /// Seconds between ticks. Without it the scene is applied once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_frequency: Option<ValueOrRange<f64>>,
    #[serde(default)]
    pub change_amount: ChangeAmount,
    #[serde(default)]
    pub change_sequence: bool,
    #[serde(default = "default_true")]
    pub animate_brightness: bool,
    #[serde(default = "default_true")]
    pub animate_color: bool,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(deserialize_with = "entity_list")]
    pub lights: Vec<EntityId>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub colors: Vec<ColorSpec>,
}

impl StartRequest {
    /// A request with every optional field at its default.
    #[must_use]
    pub fn new(name: impl Into<String>, lights: Vec<EntityId>) -> Self {
        Self {
            name: name.into(),
            ignore_off: true,
            restore: true,
            restore_power: true,
            brightness: default_brightness(),
            transition: default_transition(),
            change_frequency: None,
            change_amount: ChangeAmount::default(),
            change_sequence: false,
            animate_brightness: true,
            animate_color: true,
            priority: DEFAULT_PRIORITY,
            lights,
            colors: Vec::new(),
        }
    }

    /// Decode and validate raw service data.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Malformed`] when the data does not decode,
    /// or the error from [`validate`](Self::validate).
    pub fn from_value(data: serde_json::Value) -> Result<Self, ValidationError> {
        let request: Self = decode(data)?;
        request.validate()?;
        Ok(request)
    }

    /// Check names, light list and value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.lights.is_empty() {
            return Err(ValidationError::NoLights);
        }
        self.brightness.validate("brightness", 0, u8::MAX)?;
        self.transition
            .validate("transition", 0.0, MAX_TRANSITION)?;
        if let Some(frequency) = &self.change_frequency {
            frequency.validate("change_frequency", 0.0, MAX_CHANGE_FREQUENCY)?;
        }
        self.change_amount.validate()?;
        Ok(())
    }

    /// Whether the animation keeps running after the initial update.
    ///
    /// A zero frequency counts as none.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        match self.change_frequency {
            None => false,
            Some(ValueOrRange::Fixed(seconds)) => seconds > 0.0,
            Some(ValueOrRange::Range(_, hi)) => hi > 0.0,
        }
    }
}

/// `stop_animation` service data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StopRequest {
    pub name: String,
}

impl StopRequest {
    /// # Errors
    ///
    /// Fails when the data does not decode or the name is blank.
    pub fn from_value(data: serde_json::Value) -> Result<Self, ValidationError> {
        let request: Self = decode(data)?;
        if request.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(request)
    }
}

/// How `add_lights_to_animation` names its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationTarget {
    Name(String),
    /// A scene switch; its friendly name is the animation name.
    Switch(EntityId),
}

/// `add_lights_to_animation` service data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddLightsRequest {
    #[serde(deserialize_with = "entity_list")]
    pub lights: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        alias = "animated_scene_switch",
        skip_serializing_if = "Option::is_none"
    )]
    pub switch_entity: Option<EntityId>,
}

impl AddLightsRequest {
    /// # Errors
    ///
    /// Fails when the data does not decode, the light list is empty, or not
    /// exactly one of `name` and `switch_entity` is given.
    pub fn from_value(data: serde_json::Value) -> Result<Self, ValidationError> {
        let request: Self = decode(data)?;
        if request.lights.is_empty() {
            return Err(ValidationError::NoLights);
        }
        request.target()?;
        Ok(request)
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::AmbiguousTarget`] unless exactly one of
    /// `name` and `switch_entity` is set.
    pub fn target(&self) -> Result<AnimationTarget, ValidationError> {
        match (&self.name, &self.switch_entity) {
            (Some(name), None) => Ok(AnimationTarget::Name(name.clone())),
            (None, Some(switch)) => Ok(AnimationTarget::Switch(switch.clone())),
            _ => Err(ValidationError::AmbiguousTarget),
        }
    }
}

/// `remove_lights` service data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoveLightsRequest {
    #[serde(deserialize_with = "entity_list")]
    pub lights: Vec<EntityId>,
    #[serde(default)]
    pub skip_restore: bool,
}

impl RemoveLightsRequest {
    /// # Errors
    ///
    /// Fails when the data does not decode or the light list is empty.
    pub fn from_value(data: serde_json::Value) -> Result<Self, ValidationError> {
        let request: Self = decode(data)?;
        if request.lights.is_empty() {
            return Err(ValidationError::NoLights);
        }
        Ok(request)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(item) => vec![item],
        OneOrMany::Many(items) => items,
    })
}

/// Entity ids as a list or a comma separated string, lowercased.
fn entity_list<'de, D>(deserializer: D) -> Result<Vec<EntityId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<String> = match OneOrMany::<String>::deserialize(deserializer)? {
        OneOrMany::One(joined) => joined.split(',').map(str::to_string).collect(),
        OneOrMany::Many(items) => items,
    };
    raw.into_iter()
        .map(|id| EntityId::new(id.trim().to_lowercase()).map_err(serde::de::Error::custom))
        .collect()
}
