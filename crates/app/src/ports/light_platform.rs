//! Light platform port: the host the engine reads lights from and writes them to.
//!
//! A host (Home Assistant, a simulator, a test double) exposes three things:
//! a synchronous read of the current state, an asynchronous `light.*`
//! service call and a push stream of state changes for a set of entities.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use animated_scenes_domain::command::ServiceCall;
use animated_scenes_domain::error::PlatformError;
use animated_scenes_domain::event::StateChange;
use animated_scenes_domain::id::EntityId;
use animated_scenes_domain::light::LightState;

/// State changes for the entities passed to
/// [`subscribe_state_changes`](LightPlatform::subscribe_state_changes).
///
/// Dropping the receiver unsubscribes.
pub type StateChangeStream = mpsc::UnboundedReceiver<StateChange>;

pub trait LightPlatform: Send + Sync + 'static {
    /// Current state of `entity_id`, or `None` when the host does not know it.
    fn get_state(&self, entity_id: &EntityId) -> Option<LightState>;

    /// Issue a `light.turn_on` / `light.turn_off` call and wait for the host
    /// to accept it.
    fn call_service(
        &self,
        call: ServiceCall,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Stream every state change of `entity_ids` from now on.
    fn subscribe_state_changes(&self, entity_ids: &[EntityId]) -> StateChangeStream;
}

impl<T: LightPlatform> LightPlatform for Arc<T> {
    fn get_state(&self, entity_id: &EntityId) -> Option<LightState> {
        (**self).get_state(entity_id)
    }

    fn call_service(
        &self,
        call: ServiceCall,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send {
        (**self).call_service(call)
    }

    fn subscribe_state_changes(&self, entity_ids: &[EntityId]) -> StateChangeStream {
        (**self).subscribe_state_changes(entity_ids)
    }
}

/// Issue `call`, logging a rejection instead of propagating it.
///
/// One failing light must never take the rest of a tick (or a release)
/// down with it.
pub async fn safe_call<P: LightPlatform>(platform: &P, call: ServiceCall) {
    let description = call.to_string();
    if let Err(err) = platform.call_service(call).await {
        tracing::warn!(%err, call = %description, "light service call failed");
    }
}
