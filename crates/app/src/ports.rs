//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the engine and the host it drives.
//! They are defined here (in `app`) so that both the engine and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod light_platform;

pub use light_platform::{LightPlatform, StateChangeStream};
