//! The animation registry.
//!
//! [`Animations`] is the single source of truth for which animation runs
//! under which name, which animation owns each light, which animations are
//! interested in each light and what every tracked light looked like before
//! the first animation touched it.
//!
//! All bookkeeping sits behind one mutex that is never held across an
//! `.await`, so every table update is atomic with respect to the loops and
//! handlers that read it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};
use tracing::instrument;

use animated_scenes_domain::command::ServiceCall;
use animated_scenes_domain::error::{AnimatedScenesError, NotFoundError};
use animated_scenes_domain::event::{AnimationEvent, StateChange};
use animated_scenes_domain::id::{AnimationId, EntityId};
use animated_scenes_domain::light::LightState;
use animated_scenes_domain::service::{
    AddLightsRequest, AnimationTarget, RemoveLightsRequest, StartRequest,
};

use crate::animation::{Animation, Phase};
use crate::event_bus::InProcessEventBus;
use crate::ports::LightPlatform;
use crate::ports::light_platform::safe_call;

/// Capacity of the lifecycle event channel.
const EVENT_CAPACITY: usize = 64;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A registered animation, as reported by [`Animations::active`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveAnimation {
    pub name: String,
    pub priority: i64,
    pub phase: Phase,
    pub lights: Vec<EntityId>,
    pub active_lights: Vec<EntityId>,
}

struct Listener {
    entity_ids: Vec<EntityId>,
    task: JoinHandle<()>,
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Tables<P> {
    animations: HashMap<String, Arc<Animation<P>>>,
    light_animations: HashMap<EntityId, Vec<Arc<Animation<P>>>>,
    light_owner: HashMap<EntityId, Arc<Animation<P>>>,
    stored_states: HashMap<EntityId, LightState>,
    listener: Option<Listener>,
}

impl<P: LightPlatform> Tables<P> {
    fn new() -> Self {
        Self {
            animations: HashMap::new(),
            light_animations: HashMap::new(),
            light_owner: HashMap::new(),
            stored_states: HashMap::new(),
            listener: None,
        }
    }

    /// Register interest and take ownership when nobody outranks `animation`.
    ///
    /// Equal priority takes over, so the most recent start wins a tie.
    fn attach(&mut self, animation: &Arc<Animation<P>>, light: &EntityId) {
        let takes_over = self
            .light_owner
            .get(light)
            .is_none_or(|owner| owner.priority() <= animation.priority());
        if takes_over {
            self.light_owner.insert(light.clone(), Arc::clone(animation));
        }
        let interested = self.light_animations.entry(light.clone()).or_default();
        if !interested.iter().any(|other| other.id() == animation.id()) {
            interested.push(Arc::clone(animation));
        }
    }

    fn detach(&mut self, id: AnimationId, light: &EntityId) {
        if let Some(interested) = self.light_animations.get_mut(light) {
            interested.retain(|other| other.id() != id);
            if interested.is_empty() {
                self.light_animations.remove(light);
            }
        }
    }

    fn is_owner(&self, light: &EntityId, id: AnimationId) -> bool {
        self.light_owner
            .get(light)
            .is_some_and(|owner| owner.id() == id)
    }

    /// The interested animation with the strictly highest priority that
    /// still lists `light`. Earlier entries win ties.
    fn relevant_animation(&self, light: &EntityId) -> Option<Arc<Animation<P>>> {
        let mut best: Option<&Arc<Animation<P>>> = None;
        for candidate in self.light_animations.get(light)? {
            if !candidate.lists_light(light) {
                continue;
            }
            if best.is_none_or(|best| candidate.priority() > best.priority()) {
                best = Some(candidate);
            }
        }
        best.cloned()
    }
}

pub(crate) struct Shared<P> {
    platform: P,
    events: InProcessEventBus,
    tables: Mutex<Tables<P>>,
    rng: Mutex<fastrand::Rng>,
}

impl<P> Shared<P> {
    pub(crate) fn platform(&self) -> &P {
        &self.platform
    }
}

/// Handle to the animation registry. Cheap to clone.
pub struct Animations<P> {
    shared: Arc<Shared<P>>,
}

impl<P> Clone for Animations<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: LightPlatform> Animations<P> {
    #[must_use]
    pub fn new(platform: P) -> Self {
        Self::with_rng(platform, fastrand::Rng::new())
    }

    /// A registry whose animations draw from a deterministic sequence.
    #[must_use]
    pub fn with_seed(platform: P, seed: u64) -> Self {
        Self::with_rng(platform, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(platform: P, rng: fastrand::Rng) -> Self {
        Self {
            shared: Arc::new(Shared {
                platform,
                events: InProcessEventBus::new(EVENT_CAPACITY),
                tables: Mutex::new(Tables::new()),
                rng: Mutex::new(rng),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<Shared<P>>) -> Self {
        Self { shared }
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<Shared<P>> {
        &self.shared
    }

    fn tables(&self) -> MutexGuard<'_, Tables<P>> {
        lock(&self.shared.tables)
    }

    #[must_use]
    pub fn platform(&self) -> &P {
        &self.shared.platform
    }

    pub(crate) fn events(&self) -> &InProcessEventBus {
        &self.shared.events
    }

    /// Lifecycle notifications published after this call.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<AnimationEvent> {
        self.shared.events.subscribe()
    }

    /// Start (or restart) the animation named in `request`.
    ///
    /// A running animation of the same name is stopped and its lights
    /// handed back first. Returns once the initial writes are done.
    ///
    /// # Errors
    ///
    /// Returns [`AnimatedScenesError::Validation`] when the request does not
    /// validate.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn start(&self, request: StartRequest) -> Result<(), AnimatedScenesError> {
        request.validate()?;
        if let Some(existing) = self.animation(&request.name) {
            tracing::info!("animation already running, restarting it");
            existing.stop().await;
        }

        let seed = lock(&self.shared.rng).u64(..);
        let animation = Animation::new(&self.shared, request, fastrand::Rng::with_seed(seed));
        let lights = animation.lights();
        {
            let mut tables = self.tables();
            for light in &lights {
                tables.attach(&animation, light);
            }
            tables
                .animations
                .insert(animation.name().to_string(), Arc::clone(&animation));
        }
        self.store_states(&lights);
        animation.start().await;
        Ok(())
    }

    /// Stop the animation registered under `name`, if any, and wait for it
    /// to hand its lights back.
    #[instrument(skip(self))]
    pub async fn stop(&self, name: &str) {
        match self.animation(name) {
            Some(animation) => animation.stop().await,
            None => tracing::debug!("no animation with that name is running"),
        }
    }

    /// Add lights to a running animation.
    ///
    /// A switch target resolves through the switch's `friendly_name`,
    /// falling back to its entity id.
    ///
    /// # Errors
    ///
    /// Returns [`AnimatedScenesError::Validation`] when the target is
    /// ambiguous and [`AnimatedScenesError::NotFound`] when no animation of
    /// that name is running.
    #[instrument(skip(self, request))]
    pub async fn add_lights_to_animation(
        &self,
        request: AddLightsRequest,
    ) -> Result<(), AnimatedScenesError> {
        let name = match request.target()? {
            AnimationTarget::Name(name) => name,
            AnimationTarget::Switch(switch) => self
                .shared
                .platform
                .get_state(&switch)
                .and_then(|state| state.friendly_name().map(str::to_string))
                .unwrap_or_else(|| switch.to_string()),
        };
        let animation = self.animation(&name).ok_or_else(|| NotFoundError {
            entity: "Animation",
            id: name.clone(),
        })?;

        {
            let mut tables = self.tables();
            for light in &request.lights {
                tables.attach(&animation, light);
            }
        }
        animation.add_lights(&self.shared.platform, &request.lights);
        self.store_states(&request.lights);
        tracing::info!(animation = %name, count = request.lights.len(), "lights added");
        Ok(())
    }

    /// Detach lights from every animation that references them.
    ///
    /// Owned lights get their snapshot replayed unless `skip_restore`.
    /// Animations left without an active light are stopped.
    #[instrument(skip(self, request))]
    pub async fn remove_lights(&self, request: RemoveLightsRequest) {
        let mut affected: Vec<Arc<Animation<P>>> = Vec::new();
        let mut releases = JoinSet::new();

        for light in request.lights {
            let interested = self
                .tables()
                .light_animations
                .get(&light)
                .cloned()
                .unwrap_or_default();
            if interested.is_empty() {
                tracing::debug!(light = %light, "light is not animated");
                continue;
            }
            for animation in &interested {
                animation.remove_light(&light);
                if !affected.iter().any(|other| other.id() == animation.id()) {
                    affected.push(Arc::clone(animation));
                }
            }
            let manager = self.clone();
            let skip_restore = request.skip_restore;
            releases.spawn(async move {
                for animation in interested {
                    manager
                        .release_light(&animation, &light, true, skip_restore)
                        .await;
                }
            });
        }
        while let Some(result) = releases.join_next().await {
            if let Err(err) = result {
                tracing::warn!(%err, "light release task failed");
            }
        }

        for animation in affected {
            if animation.active_lights().is_empty() {
                tracing::info!(animation = %animation.name(), "no lights left, stopping");
                animation.stop().await;
            }
        }
    }

    /// Give `light` up on behalf of `animation`.
    ///
    /// A non-owner only loses interest. An owner hands the light to the next
    /// most relevant animation unless `skip_ownership`; otherwise the
    /// snapshot is dropped and, when the animation restores and
    /// `skip_restore` is unset, replayed.
    pub(crate) async fn release_light(
        &self,
        animation: &Animation<P>,
        light: &EntityId,
        skip_ownership: bool,
        skip_restore: bool,
    ) {
        let snapshot = {
            let mut tables = self.tables();
            tables.detach(animation.id(), light);
            if !tables.is_owner(light, animation.id()) {
                tracing::info!(animation = %animation.name(), light = %light, "not the owner, leaving light alone");
                return;
            }
            if !skip_ownership && let Some(next) = tables.relevant_animation(light) {
                tracing::info!(from = %animation.name(), to = %next.name(), light = %light, "handing light over");
                tables.light_owner.insert(light.clone(), next);
                return;
            }
            tables.light_owner.remove(light);
            tables.stored_states.remove(light)
        };
        self.refresh_listener();

        if skip_restore || !animation.restores() {
            return;
        }
        let Some(snapshot) = snapshot else {
            tracing::debug!(light = %light, "no snapshot, nothing to restore");
            return;
        };
        let call = if snapshot.is_on() {
            ServiceCall::turn_on(snapshot.restore_command())
        } else if animation.restores_power() {
            ServiceCall::turn_off(light.clone())
        } else {
            return;
        };
        tracing::debug!(light = %light, %call, "restoring light");
        safe_call(&self.shared.platform, call).await;
    }

    /// Drop `animation` from the registry if it still holds its name.
    pub(crate) fn release_animation(&self, animation: &Animation<P>) {
        {
            let mut tables = self.tables();
            if tables
                .animations
                .get(animation.name())
                .is_some_and(|registered| registered.id() == animation.id())
            {
                tables.animations.remove(animation.name());
            }
            for interested in tables.light_animations.values_mut() {
                interested.retain(|other| other.id() != animation.id());
            }
            tables.light_animations.retain(|_, interested| !interested.is_empty());
        }
        self.refresh_listener();
    }

    /// The animation that should own `light` now, by priority.
    #[must_use]
    pub fn refresh_animation_for_light(&self, light: &EntityId) -> Option<Arc<Animation<P>>> {
        self.tables().relevant_animation(light)
    }

    /// Snapshot every light not already snapshotted, then track them.
    pub fn store_states(&self, lights: &[EntityId]) {
        {
            let mut tables = self.tables();
            for light in lights {
                if tables.stored_states.contains_key(light) {
                    continue;
                }
                match self.shared.platform.get_state(light) {
                    Some(state) => {
                        tables.stored_states.insert(light.clone(), state);
                    }
                    None => tracing::warn!(light = %light, "light not found, nothing to snapshot"),
                }
            }
        }
        self.refresh_listener();
    }

    /// Make the state-change subscription cover exactly the snapshotted lights.
    ///
    /// Must be called from within a tokio runtime.
    pub fn refresh_listener(&self) {
        let mut tables = self.tables();
        let mut tracked: Vec<EntityId> = tables.stored_states.keys().cloned().collect();
        tracked.sort();
        if tables
            .listener
            .as_ref()
            .is_some_and(|listener| listener.entity_ids == tracked)
        {
            return;
        }
        tables.listener = None;
        if tracked.is_empty() {
            tracing::debug!("no tracked lights, state listener removed");
            return;
        }

        let mut changes = self.shared.platform.subscribe_state_changes(&tracked);
        let shared = Arc::downgrade(&self.shared);
        let task = tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                let manager = Self::from_shared(shared);
                // the handler may rebuild this listener
                tokio::spawn(async move { manager.handle_external_change(change).await });
            }
        });
        tracing::debug!(count = tracked.len(), "state listener refreshed");
        tables.listener = Some(Listener {
            entity_ids: tracked,
            task,
        });
    }

    /// React to a tracked light being turned on outside the engine.
    ///
    /// The most relevant animation takes the light, puts it back in its
    /// active set and writes it right away.
    pub async fn handle_external_change(&self, change: StateChange) {
        if !change.is_external_turn_on() {
            return;
        }
        let light = change.entity_id;
        let animation = {
            let mut tables = self.tables();
            let best = tables.relevant_animation(&light);
            let current = tables
                .light_owner
                .get(&light)
                .filter(|owner| owner.lists_light(&light))
                .filter(|owner| {
                    best.as_ref()
                        .is_none_or(|best| owner.priority() >= best.priority())
                })
                .cloned();
            let chosen = current.or(best);
            if let Some(chosen) = &chosen {
                tables.light_owner.insert(light.clone(), Arc::clone(chosen));
                if let Some(state) = change.new_state {
                    tables.stored_states.entry(light.clone()).or_insert(state);
                }
            }
            chosen
        };
        let Some(animation) = animation else {
            tracing::debug!(light = %light, "no animation claims the light");
            return;
        };
        self.refresh_listener();
        if animation.readmit(&light) {
            tracing::info!(animation = %animation.name(), light = %light, "light turned on, animating it again");
        }
        animation.update_light(&light, false).await;
    }

    /// Stop every animation and drop the state listener.
    pub async fn shutdown(&self) {
        let running: Vec<Arc<Animation<P>>> = self.tables().animations.values().cloned().collect();
        for animation in running {
            animation.stop().await;
        }
        self.tables().listener = None;
    }

    /// The animation registered under `name`.
    #[must_use]
    pub fn animation(&self, name: &str) -> Option<Arc<Animation<P>>> {
        self.tables().animations.get(name).cloned()
    }

    #[must_use]
    pub fn active(&self) -> Vec<ActiveAnimation> {
        let mut active: Vec<ActiveAnimation> = self
            .tables()
            .animations
            .values()
            .map(|animation| ActiveAnimation {
                name: animation.name().to_string(),
                priority: animation.priority(),
                phase: animation.phase(),
                lights: animation.lights(),
                active_lights: animation.active_lights(),
            })
            .collect();
        active.sort_by(|a, b| a.name.cmp(&b.name));
        active
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.tables().animations.len()
    }

    /// Name of the animation currently owning `light`.
    #[must_use]
    pub fn owner_of(&self, light: &EntityId) -> Option<String> {
        self.tables()
            .light_owner
            .get(light)
            .map(|owner| owner.name().to_string())
    }

    /// Snapshot taken for `light`, if it is tracked.
    #[must_use]
    pub fn stored_state(&self, light: &EntityId) -> Option<LightState> {
        self.tables().stored_states.get(light).cloned()
    }

    /// Lights the state listener currently covers.
    #[must_use]
    pub fn tracked_lights(&self) -> Vec<EntityId> {
        self.tables()
            .listener
            .as_ref()
            .map(|listener| listener.entity_ids.clone())
            .unwrap_or_default()
    }

    pub(crate) fn is_owner(&self, light: &EntityId, id: AnimationId) -> bool {
        self.tables().is_owner(light, id)
    }

    pub(crate) fn is_registered(&self, id: AnimationId, name: &str) -> bool {
        self.tables()
            .animations
            .get(name)
            .is_some_and(|registered| registered.id() == id)
    }
}
