//! End-to-end tests for the full animated-scenesd stack.
//!
//! Each test wires the real engine, the virtual light platform and the axum
//! router, then drives it through `tower::ServiceExt::oneshot`: no TCP port
//! is bound.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use animated_scenes_adapter_http_axum::router;
use animated_scenes_adapter_http_axum::state::AppState;
use animated_scenes_adapter_virtual::{VirtualLight, VirtualPlatform};
use animated_scenes_app::animations::Animations;
use animated_scenes_app::ports::LightPlatform;
use animated_scenes_app::services::animation_service::AnimationService;
use animated_scenes_app::services::scene_switch::{SceneSwitch, SceneSwitches};
use animated_scenes_domain::command::LightService;
use animated_scenes_domain::id::EntityId;
use animated_scenes_domain::light::EntityState;
use animated_scenes_domain::service::StartRequest;
use animated_scenes_domain::value::ValueOrRange;

struct Stack {
    platform: Arc<VirtualPlatform>,
    animations: Animations<Arc<VirtualPlatform>>,
    app: axum::Router,
}

fn id(raw: &str) -> EntityId {
    EntityId::new(raw).unwrap()
}

/// Kitchen and desk are on, porch is off; one "Movie Night" scene on the desk.
fn stack() -> Stack {
    let platform = Arc::new(VirtualPlatform::new());
    platform.add_light(
        VirtualLight::new(id("light.kitchen"), "Kitchen")
            .with_state(EntityState::On)
            .with_brightness(40),
    );
    platform.add_light(VirtualLight::new(id("light.desk"), "Desk").with_state(EntityState::On));
    platform.add_light(VirtualLight::new(id("light.porch"), "Porch"));

    let animations = Animations::with_seed(Arc::clone(&platform), 11);

    let mut scene = StartRequest::new("Movie Night", vec![id("light.desk")]);
    scene.change_frequency = Some(ValueOrRange::Fixed(20.0));
    let switch = SceneSwitch::new(scene).unwrap();
    platform.upsert_switch(switch.entity_state());

    let state = AppState::new(
        AnimationService::new(animations.clone()),
        SceneSwitches::new(vec![switch]),
    );
    Stack {
        platform,
        animations,
        app: router::build(state),
    }
}

fn call(service: &str, data: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/services/{service}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(data.to_string()))
        .unwrap()
}

async fn activity(app: &axum::Router) -> serde_json::Value {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/animations")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let stack = stack();
    let resp = stack
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn should_animate_then_restore_on_stop() {
    let stack = stack();

    let resp = stack
        .app
        .clone()
        .oneshot(call(
            "start_animation",
            &serde_json::json!({
                "name": "Sunset",
                "lights": ["light.kitchen"],
                "brightness": 200,
                "change_frequency": 5,
                "colors": [{"color_type": "rgb_color", "color": [255, 80, 0]}]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let kitchen = stack.platform.get_state(&id("light.kitchen")).unwrap();
    assert_eq!(kitchen.brightness(), Some(200));
    assert_eq!(stack.animations.owner_of(&id("light.kitchen")).as_deref(), Some("Sunset"));

    // a few ticks go by
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(stack.platform.calls_for(&id("light.kitchen")).len() >= 3);

    let resp = stack
        .app
        .clone()
        .oneshot(call("stop_animation", &serde_json::json!({"name": "Sunset"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let kitchen = stack.platform.get_state(&id("light.kitchen")).unwrap();
    assert!(kitchen.is_on());
    assert_eq!(kitchen.brightness(), Some(40));
    assert_eq!(activity(&stack.app).await["state"], 0);
}

#[tokio::test(start_paused = true)]
async fn should_hand_light_to_higher_priority_and_back() {
    let stack = stack();
    for (name, priority) in [("Low", 10), ("High", 200)] {
        let resp = stack
            .app
            .clone()
            .oneshot(call(
                "start_animation",
                &serde_json::json!({
                    "name": name,
                    "lights": ["light.kitchen"],
                    "priority": priority,
                    "change_frequency": 30
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
    assert_eq!(stack.animations.owner_of(&id("light.kitchen")).as_deref(), Some("High"));

    stack.animations.stop("High").await;
    assert_eq!(stack.animations.owner_of(&id("light.kitchen")).as_deref(), Some("Low"));

    stack.animations.shutdown().await;
    assert_eq!(stack.animations.owner_of(&id("light.kitchen")), None);
}

#[tokio::test(start_paused = true)]
async fn should_apply_one_shot_scene_and_keep_it() {
    let stack = stack();

    let resp = stack
        .app
        .clone()
        .oneshot(call(
            "start_animation",
            &serde_json::json!({
                "name": "Reading",
                "lights": "light.kitchen",
                "brightness": 255,
                "colors": [{"color_type": "color_temp_kelvin", "color": 4000}],
                "restore": false
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let kitchen = stack.platform.get_state(&id("light.kitchen")).unwrap();
    assert_eq!(kitchen.brightness(), Some(255));
    assert_eq!(activity(&stack.app).await["state"], 0);
    assert_eq!(stack.platform.calls_for(&id("light.kitchen")).len(), 1);
}

// ---------------------------------------------------------------------------
// Light membership
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn should_add_lights_through_scene_switch() {
    let stack = stack();

    let resp = stack
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/scenes/switch.animated_scenes_movie_night/turn_on")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = stack
        .app
        .clone()
        .oneshot(call(
            "add_lights_to_animation",
            &serde_json::json!({
                "animated_scene_switch": "switch.animated_scenes_movie_night",
                "lights": ["light.kitchen"]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let body = activity(&stack.app).await;
    assert_eq!(body["animations"][0]["name"], "Movie Night");
    let lights = body["animations"][0]["lights"].as_array().unwrap();
    assert!(lights.contains(&serde_json::json!("light.kitchen")));
    assert_eq!(
        stack.animations.owner_of(&id("light.kitchen")).as_deref(),
        Some("Movie Night")
    );

    stack.animations.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn should_stop_animation_when_last_light_is_removed() {
    let stack = stack();
    stack
        .app
        .clone()
        .oneshot(call(
            "start_animation",
            &serde_json::json!({"name": "Party", "lights": ["light.kitchen"], "change_frequency": 2}),
        ))
        .await
        .unwrap();

    let resp = stack
        .app
        .clone()
        .oneshot(call(
            "remove_lights",
            &serde_json::json!({"lights": ["light.kitchen"], "skip_restore": true}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    assert_eq!(activity(&stack.app).await["state"], 0);
    assert_eq!(stack.animations.owner_of(&id("light.kitchen")), None);
}

#[tokio::test(start_paused = true)]
async fn should_resume_light_turned_on_externally() {
    let stack = stack();
    stack
        .app
        .clone()
        .oneshot(call(
            "start_animation",
            &serde_json::json!({
                "name": "Party",
                "lights": ["light.kitchen", "light.porch"],
                "change_frequency": 30
            }),
        ))
        .await
        .unwrap();

    // porch is off and skipped
    assert!(stack.platform.calls_for(&id("light.porch")).is_empty());
    let body = activity(&stack.app).await;
    assert_eq!(
        body["animations"][0]["active_lights"],
        serde_json::json!(["light.kitchen"])
    );

    stack
        .platform
        .set_state(&id("light.porch"), EntityState::On)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let porch_calls = stack.platform.calls_for(&id("light.porch"));
    assert_eq!(porch_calls.len(), 1);
    assert_eq!(porch_calls[0].service, LightService::TurnOn);
    let body = activity(&stack.app).await;
    let active = body["animations"][0]["active_lights"].as_array().unwrap();
    assert!(active.contains(&serde_json::json!("light.porch")));

    stack.animations.shutdown().await;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_reject_ambiguous_add_lights_target() {
    let stack = stack();
    let resp = stack
        .app
        .oneshot(call(
            "add_lights_to_animation",
            &serde_json::json!({
                "name": "Movie Night",
                "animated_scene_switch": "switch.animated_scenes_movie_night",
                "lights": ["light.kitchen"]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn should_reject_unknown_fields() {
    let stack = stack();
    let resp = stack
        .app
        .oneshot(call(
            "start_animation",
            &serde_json::json!({"name": "Party", "lights": ["light.kitchen"], "speed": 3}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(stack.platform.calls().is_empty());
}
