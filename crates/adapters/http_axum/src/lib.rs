//! # animated-scenes-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Accept `animated_scenes.*` service calls as JSON
//!   (`POST /api/services/{service}`)
//! - Report the activity summary (`GET /api/animations`)
//! - List and toggle the configured scene switches (`/api/scenes`)
//! - Stream animation lifecycle events over SSE (`GET /api/events`)
//!
//! ## Dependency rule
//! Depends on `animated-scenes-app` (for the port trait and services) and
//! `animated-scenes-domain` (for request and error types). Never leaks axum
//! types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
