//! Application services: the driving side of the engine.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod animation_service;
pub mod scene_switch;
