//! # animated-scenes-app
//!
//! Application layer: the animation engine and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `LightPlatform`: read light state, issue `light.*` calls, stream state changes
//! - Publish lifecycle notifications on an in-process broadcast bus
//! - Run animations: the per-scene loop in [`animation`] and the registry,
//!   light ownership and snapshot bookkeeping in [`animations`]
//! - Expose **driving ports** as services: the four `animated_scenes.*`
//!   service handlers and the per-scene switch
//!
//! ## Dependency rule
//! Depends on `animated-scenes-domain` only (plus `tokio` for tasks, timers and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod animation;
pub mod animations;
pub mod event_bus;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
