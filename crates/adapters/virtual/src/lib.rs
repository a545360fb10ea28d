//! # animated-scenes-adapter-virtual
//!
//! Virtual light platform that simulates a host for demos and tests.
//!
//! ## Provided entities
//!
//! | Device | Entity ID | Behaviour |
//! |--------|-----------|-----------|
//! | Virtual Light | `light.*` | Applies `turn_on` / `turn_off` payloads (brightness, color, color mode) |
//! | Virtual Switch | `switch.animated_scenes_*` | Mirrors a scene switch so it can be resolved by `friendly_name` |
//!
//! Every accepted call is recorded, and every state change is fanned out to
//! the subscribers interested in that entity.
//!
//! ## Dependency rule
//!
//! Depends on `animated-scenes-app` (port traits) and `animated-scenes-domain` only.

mod devices;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use animated_scenes_app::ports::{LightPlatform, StateChangeStream};
use animated_scenes_domain::command::ServiceCall;
use animated_scenes_domain::error::{NotFoundError, PlatformError};
use animated_scenes_domain::event::{ChangeOrigin, StateChange};
use animated_scenes_domain::id::EntityId;
use animated_scenes_domain::light::{EntityState, LightState};

pub use devices::{VirtualDevice, VirtualLight, VirtualSwitch};

struct Subscriber {
    entity_ids: HashSet<EntityId>,
    sender: mpsc::UnboundedSender<StateChange>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory host with simulated lights and switches.
#[derive(Default)]
pub struct VirtualPlatform {
    devices: Mutex<HashMap<EntityId, VirtualDevice>>,
    calls: Mutex<Vec<ServiceCall>>,
    failing: Mutex<HashSet<EntityId>>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl VirtualPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a simulated light.
    pub fn add_light(&self, light: VirtualLight) {
        let entity_id = light.state().entity_id.clone();
        lock(&self.devices).insert(entity_id, VirtualDevice::Light(light));
    }

    /// Publish or refresh a switch entity.
    pub fn upsert_switch(&self, state: LightState) {
        let entity_id = state.entity_id.clone();
        let change = {
            let mut devices = lock(&self.devices);
            match devices.get_mut(&entity_id) {
                Some(VirtualDevice::Switch(switch)) => {
                    let old = switch.state().clone();
                    switch.update(state);
                    Some((old, switch.state().clone()))
                }
                _ => {
                    devices.insert(entity_id.clone(), VirtualDevice::Switch(VirtualSwitch::new(state)));
                    None
                }
            }
        };
        if let Some((old, new)) = change
            && old.state != new.state
        {
            self.notify(StateChange::new(entity_id, Some(old), Some(new), ChangeOrigin::External));
        }
    }

    /// Change an entity's on/off state from outside the engine.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] for an unknown entity.
    pub fn set_state(&self, entity_id: &EntityId, state: EntityState) -> Result<LightState, NotFoundError> {
        let (old, new) = {
            let mut devices = lock(&self.devices);
            let device = devices.get_mut(entity_id).ok_or_else(|| NotFoundError {
                entity: "Entity",
                id: entity_id.to_string(),
            })?;
            let old = device.state().clone();
            (old, device.set_state(state))
        };
        tracing::debug!(entity_id = %entity_id, from = %old.state, to = %new.state, "entity changed externally");
        if old.state != new.state {
            self.notify(StateChange::new(
                entity_id.clone(),
                Some(old),
                Some(new.clone()),
                ChangeOrigin::External,
            ));
        }
        Ok(new)
    }

    /// Reject every future call targeting `entity_id`.
    pub fn fail_calls_for(&self, entity_id: EntityId) {
        lock(&self.failing).insert(entity_id);
    }

    /// Every call received so far, accepted or not.
    #[must_use]
    pub fn calls(&self) -> Vec<ServiceCall> {
        lock(&self.calls).clone()
    }

    #[must_use]
    pub fn calls_for(&self, entity_id: &EntityId) -> Vec<ServiceCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.entity_id() == entity_id)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Current state of every entity, sorted by entity id.
    #[must_use]
    pub fn entities(&self) -> Vec<LightState> {
        let mut entities: Vec<LightState> = lock(&self.devices)
            .values()
            .map(|device| device.state().clone())
            .collect();
        entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        entities
    }

    fn notify(&self, change: StateChange) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|subscriber| !subscriber.sender.is_closed());
        for subscriber in subscribers.iter() {
            if subscriber.entity_ids.contains(&change.entity_id) {
                // a closed receiver is pruned on the next change
                let _ = subscriber.sender.send(change.clone());
            }
        }
    }

    fn apply(&self, call: &ServiceCall) -> Result<(LightState, LightState), PlatformError> {
        if lock(&self.failing).contains(call.entity_id()) {
            return Err(PlatformError::Rejected(call.to_string()));
        }
        let mut devices = lock(&self.devices);
        let device = devices
            .get_mut(call.entity_id())
            .ok_or_else(|| PlatformError::UnknownEntity(call.entity_id().to_string()))?;
        let old = device.state().clone();
        let new = device.handle_service(call)?;
        Ok((old, new))
    }
}

impl LightPlatform for VirtualPlatform {
    fn get_state(&self, entity_id: &EntityId) -> Option<LightState> {
        lock(&self.devices)
            .get(entity_id)
            .map(|device| device.state().clone())
    }

    fn call_service(
        &self,
        call: ServiceCall,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send {
        lock(&self.calls).push(call.clone());
        let result = self.apply(&call).map(|(old, new)| {
            tracing::debug!(%call, state = %new.state, "virtual light updated");
            if old != new {
                self.notify(StateChange::new(
                    call.entity_id().clone(),
                    Some(old),
                    Some(new),
                    ChangeOrigin::Engine,
                ));
            }
        });
        async move { result }
    }

    fn subscribe_state_changes(&self, entity_ids: &[EntityId]) -> StateChangeStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(Subscriber {
            entity_ids: entity_ids.iter().cloned().collect(),
            sender,
        });
        receiver
    }
}
