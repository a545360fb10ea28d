//! Static-or-random values.
//!
//! Most animation settings accept either a single value (`5`) or a two
//! element range (`[2, 8]`). Ranges are sampled every time the value is
//! needed, so a ranged transition gives every light write its own duration.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A fixed value or an inclusive `[lo, hi]` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueOrRange<T> {
    Fixed(T),
    Range(T, T),
}

/// Numeric types a [`ValueOrRange`] can be sampled for.
pub trait Sample: Copy + PartialOrd + Into<f64> {
    /// Step used by [`ValueOrRange::sample`].
    const UNIT: Self;

    /// Draw a value from `[lo, hi]`.
    ///
    /// Integers are drawn from `lo, lo + step, ...` up to and including `hi`
    /// when it lies on the step. Floats are drawn continuously and rounded to
    /// one decimal, with `hi` nudged up by one ulp so it stays reachable after
    /// rounding; `step` is ignored.
    fn sample_between(lo: Self, hi: Self, step: Self, rng: &mut fastrand::Rng) -> Self;
}

impl Sample for u8 {
    const UNIT: Self = 1;

    fn sample_between(lo: Self, hi: Self, step: Self, rng: &mut fastrand::Rng) -> Self {
        if hi <= lo {
            return lo;
        }
        let step = step.max(1);
        lo + step * rng.u8(0..=(hi - lo) / step)
    }
}

impl Sample for u32 {
    const UNIT: Self = 1;

    fn sample_between(lo: Self, hi: Self, step: Self, rng: &mut fastrand::Rng) -> Self {
        if hi <= lo {
            return lo;
        }
        let step = step.max(1);
        lo + step * rng.u32(0..=(hi - lo) / step)
    }
}

impl Sample for f64 {
    const UNIT: Self = 1.0;

    fn sample_between(lo: Self, hi: Self, _step: Self, rng: &mut fastrand::Rng) -> Self {
        if hi <= lo {
            return lo;
        }
        let upper = hi.next_up();
        round_to_tenth(lo + rng.f64() * (upper - lo))
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl<T: Sample> ValueOrRange<T> {
    /// Return the fixed value, or sample the range with a unit step.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> T {
        self.sample_stepped(T::UNIT, rng)
    }

    /// Like [`sample`](Self::sample) with an explicit integer step.
    pub fn sample_stepped(&self, step: T, rng: &mut fastrand::Rng) -> T {
        match *self {
            Self::Fixed(value) => value,
            Self::Range(lo, hi) => T::sample_between(lo, hi, step, rng),
        }
    }

    /// The value when it is not a range.
    #[must_use]
    pub fn fixed(&self) -> Option<T> {
        match *self {
            Self::Fixed(value) => Some(value),
            Self::Range(..) => None,
        }
    }

    /// Check both bounds lie in `[min, max]` and that `lo <= hi`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfRange`] or
    /// [`ValidationError::InvertedRange`] naming `field`.
    pub fn validate(&self, field: &str, min: T, max: T) -> Result<(), ValidationError> {
        let check = |value: T| {
            let as_float: f64 = value.into();
            if as_float.is_nan() || value < min || value > max {
                Err(ValidationError::OutOfRange {
                    field: field.to_string(),
                    value: as_float,
                    min: min.into(),
                    max: max.into(),
                })
            } else {
                Ok(())
            }
        };
        match *self {
            Self::Fixed(value) => check(value),
            Self::Range(lo, hi) => {
                check(lo)?;
                check(hi)?;
                if lo > hi {
                    return Err(ValidationError::InvertedRange {
                        field: field.to_string(),
                        lo: lo.into(),
                        hi: hi.into(),
                    });
                }
                Ok(())
            }
        }
    }
}

/// How many lights an animation updates per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawChangeAmount", into = "RawChangeAmount")]
pub enum ChangeAmount {
    /// Every active light.
    All,
    Count(ValueOrRange<u32>),
}

impl Default for ChangeAmount {
    fn default() -> Self {
        Self::Count(ValueOrRange::Fixed(1))
    }
}

impl ChangeAmount {
    /// Turn the setting into a concrete count for a tick.
    ///
    /// The result never exceeds `active`; zero means nothing changes.
    pub fn resolve(&self, active: usize, rng: &mut fastrand::Rng) -> usize {
        match self {
            Self::All => active,
            Self::Count(value) => usize::try_from(value.sample(rng))
                .unwrap_or(usize::MAX)
                .min(active),
        }
    }

    /// # Errors
    ///
    /// Fails when a count lies outside `0..=65535` or a range is inverted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::All => Ok(()),
            Self::Count(value) => value.validate("change_amount", 0, u32::from(u16::MAX)),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawChangeAmount {
    Keyword(String),
    Count(ValueOrRange<u32>),
}

impl TryFrom<RawChangeAmount> for ChangeAmount {
    type Error = ValidationError;

    fn try_from(raw: RawChangeAmount) -> Result<Self, Self::Error> {
        match raw {
            RawChangeAmount::Keyword(word) if word == "all" => Ok(Self::All),
            RawChangeAmount::Keyword(word) => Err(ValidationError::InvalidChangeAmount(word)),
            RawChangeAmount::Count(value) => Ok(Self::Count(value)),
        }
    }
}

impl From<ChangeAmount> for RawChangeAmount {
    fn from(amount: ChangeAmount) -> Self {
        match amount {
            ChangeAmount::All => Self::Keyword("all".to_string()),
            ChangeAmount::Count(value) => Self::Count(value),
        }
    }
}
