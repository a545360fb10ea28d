//! # animated-scenesd: animated scenes daemon
//!
//! Composition root that wires the engine to a light platform and serves it
//! over HTTP.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and install logging
//! - Build the virtual light platform from the configured lights
//! - Construct the animation engine and the application services
//! - Publish the scene switches and start the `autostart` ones
//! - Build the axum router, bind to a TCP port and serve
//! - On SIGINT, stop every animation so lights are handed back
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use animated_scenes_adapter_http_axum::state::AppState;
use animated_scenes_adapter_virtual::VirtualPlatform;
use animated_scenes_app::animations::Animations;
use animated_scenes_app::services::animation_service::AnimationService;
use animated_scenes_app::services::scene_switch::{SceneSwitch, SceneSwitches};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;
    init_logging(&config.logging.filter);

    // Platform
    let platform = Arc::new(VirtualPlatform::new());
    for light in &config.lights {
        platform.add_light(light.to_virtual());
    }
    tracing::info!(lights = config.lights.len(), "virtual lights ready");

    // Engine & services
    let animations = Animations::new(Arc::clone(&platform));
    let animation_service = AnimationService::new(animations.clone());

    // Scene switches
    let mut autostart = HashSet::new();
    let mut switches = Vec::new();
    for (request, start) in config.scene_requests()? {
        let switch = SceneSwitch::new(request)?;
        if start {
            autostart.insert(switch.entity_id().clone());
        }
        platform.upsert_switch(switch.entity_state());
        switches.push(switch);
    }
    let switches = Arc::new(SceneSwitches::new(switches));
    for switch in switches.iter().filter(|s| autostart.contains(s.entity_id())) {
        if let Err(err) = switch.turn_on(&animations).await {
            tracing::warn!(%err, switch = %switch.entity_id(), "failed to autostart scene");
        }
        platform.upsert_switch(switch.entity_state());
    }
    tokio::spawn(mirror_switches(
        animations.clone(),
        Arc::clone(&switches),
        Arc::clone(&platform),
    ));

    // HTTP
    let state = AppState::new(animation_service, switches);
    let app = animated_scenes_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(address = %bind_addr, "animated-scenesd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("stopping animations");
    animations.shutdown().await;
    Ok(())
}

fn init_logging(filter: &str) {
    let (filter, invalid) = match EnvFilter::try_new(filter) {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new("info"), Some(err)),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    if let Some(err) = invalid {
        tracing::warn!(%err, "invalid log filter, falling back to info");
    }
}

/// Keep the published switch entities in step with their scenes.
async fn mirror_switches(
    animations: Animations<Arc<VirtualPlatform>>,
    switches: Arc<SceneSwitches>,
    platform: Arc<VirtualPlatform>,
) {
    let mut events = animations.subscribe_events();
    loop {
        match events.recv().await {
            Ok(_) | Err(RecvError::Lagged(_)) => {
                for switch in switches.iter() {
                    platform.upsert_switch(switch.entity_state());
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
