//! In-memory light platform shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use animated_scenes_domain::command::{LightService, ServiceCall};
use animated_scenes_domain::error::PlatformError;
use animated_scenes_domain::event::{ChangeOrigin, StateChange};
use animated_scenes_domain::id::EntityId;
use animated_scenes_domain::light::{EntityState, LightState};
use animated_scenes_domain::service::StartRequest;
use animated_scenes_domain::value::ValueOrRange;

use crate::ports::{LightPlatform, StateChangeStream};

pub(crate) fn id(raw: &str) -> EntityId {
    EntityId::new(raw).unwrap()
}

/// A recurring request over `lights` with a single fixed frequency.
pub(crate) fn recurring(name: &str, lights: &[&str], seconds: f64) -> StartRequest {
    let mut request = StartRequest::new(name, lights.iter().copied().map(id).collect());
    request.change_frequency = Some(ValueOrRange::Fixed(seconds));
    request
}

#[derive(Default)]
pub(crate) struct MockPlatform {
    states: Mutex<HashMap<EntityId, LightState>>,
    calls: Mutex<Vec<ServiceCall>>,
    failing: Mutex<HashSet<EntityId>>,
    subscribers: Mutex<Vec<(Vec<EntityId>, mpsc::UnboundedSender<StateChange>)>>,
}

impl MockPlatform {
    pub(crate) fn with_lights(lights: &[(&str, EntityState)]) -> Arc<Self> {
        let platform = Self::default();
        for (light, state) in lights {
            platform.insert(LightState::new(id(light), *state));
        }
        Arc::new(platform)
    }

    pub(crate) fn insert(&self, state: LightState) {
        self.states
            .lock()
            .unwrap()
            .insert(state.entity_id.clone(), state);
    }

    pub(crate) fn fail_calls_for(&self, light: &str) {
        self.failing.lock().unwrap().insert(id(light));
    }

    pub(crate) fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_for(&self, light: &str) -> Vec<ServiceCall> {
        let light = id(light);
        self.calls()
            .into_iter()
            .filter(|call| call.entity_id() == &light)
            .collect()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Change a light the way a wall switch would.
    pub(crate) fn set_externally(&self, light: &str, state: EntityState) {
        let light = id(light);
        let old = self.get_state(&light);
        let new = LightState::new(light.clone(), state);
        self.insert(new.clone());
        self.notify(StateChange::new(light, old, Some(new), ChangeOrigin::External));
    }

    fn notify(&self, change: StateChange) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|(_, sender)| !sender.is_closed());
        for (entity_ids, sender) in subscribers.iter() {
            if entity_ids.contains(&change.entity_id) {
                let _ = sender.send(change.clone());
            }
        }
    }
}

impl LightPlatform for MockPlatform {
    fn get_state(&self, entity_id: &EntityId) -> Option<LightState> {
        self.states.lock().unwrap().get(entity_id).cloned()
    }

    fn call_service(
        &self,
        call: ServiceCall,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send {
        self.calls.lock().unwrap().push(call.clone());
        let result = if self.failing.lock().unwrap().contains(call.entity_id()) {
            Err(PlatformError::Rejected(call.to_string()))
        } else {
            let light = call.entity_id().clone();
            let old = self.get_state(&light);
            let state = match call.service {
                LightService::TurnOn => EntityState::On,
                LightService::TurnOff => EntityState::Off,
            };
            let new = LightState::new(light.clone(), state);
            self.insert(new.clone());
            self.notify(StateChange::new(light, old, Some(new), ChangeOrigin::Engine));
            Ok(())
        };
        async move { result }
    }

    fn subscribe_state_changes(&self, entity_ids: &[EntityId]) -> StateChangeStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap()
            .push((entity_ids.to_vec(), sender));
        receiver
    }
}
