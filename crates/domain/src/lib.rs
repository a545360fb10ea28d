//! # animated-scenes-domain
//!
//! Pure domain model for the animated scenes engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions
//! - Define **light state** as reported by the host (on/off, color attributes)
//! - Define **light commands** (`light.turn_on` / `light.turn_off` payloads)
//! - Define **color specs** and the color math used to perturb them
//! - Define **value ranges** (`5` or `[2, 8]`) and how they are sampled
//! - Define the validated **service requests** (`start`, `stop`, `add_lights`, `remove_lights`)
//! - Define **events** (animation lifecycle, light state changes)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod color;
pub mod command;
pub mod event;
pub mod light;
pub mod service;
pub mod value;
