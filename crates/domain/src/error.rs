//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`AnimatedScenesError`] via `#[from]`.

/// Top-level error returned by application services.
#[derive(Debug, thiserror::Error)]
pub enum AnimatedScenesError {
    /// A service call did not match its schema.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The targeted animation, entity or service does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A color could not be converted.
    #[error("color error")]
    Color(#[from] ColorError),

    /// The host platform rejected a call.
    #[error("platform error")]
    Platform(#[from] PlatformError),
}

/// Schema violations in service data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("animation name must not be empty")]
    EmptyName,

    #[error("at least one light is required")]
    NoLights,

    #[error("invalid entity id `{0}`")]
    InvalidEntityId(String),

    #[error("`{field}` must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("`{field}` range lower bound {lo} is greater than upper bound {hi}")]
    InvertedRange { field: String, lo: f64, hi: f64 },

    #[error("`change_amount` must be an integer, a range or \"all\", got \"{0}\"")]
    InvalidChangeAmount(String),

    #[error("unknown color type `{0}`")]
    UnknownColorType(String),

    #[error("invalid `{color_type}` value: {reason}")]
    InvalidColor {
        color_type: String,
        reason: String,
    },

    #[error("exactly one of `name` or `switch_entity` must be provided")]
    AmbiguousTarget,

    /// The payload could not be decoded at all (wrong types, unknown fields, …).
    #[error("malformed service data: {0}")]
    Malformed(String),
}

/// A lookup by identifier found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} `{id}` not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Color conversion failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    #[error("mireds must be a positive integer, got {0}")]
    InvalidMireds(i64),
}

/// Failures reported by the host platform when calling a service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("entity `{0}` is unknown to the platform")]
    UnknownEntity(String),

    #[error("service `{domain}.{service}` is not supported")]
    UnsupportedService { domain: String, service: String },

    #[error("service call rejected: {0}")]
    Rejected(String),
}
