//! One running scene: its light set, its palette and its loop.
//!
//! An [`Animation`] never writes to a light it does not own. Ownership,
//! snapshots and the name registry live in [`Animations`]; the animation
//! only asks whether it may write and hands its lights back when it ends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

use animated_scenes_domain::color::{ColorSpec, find_nearby_color};
use animated_scenes_domain::command::{LightCommand, ServiceCall};
use animated_scenes_domain::event::AnimationEvent;
use animated_scenes_domain::id::{AnimationId, EntityId};
use animated_scenes_domain::service::StartRequest;
use animated_scenes_domain::value::ValueOrRange;

use crate::animations::{Animations, Shared, lock};
use crate::ports::LightPlatform;
use crate::ports::light_platform::safe_call;

/// Lifecycle of an [`Animation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Built and registered, initial writes not issued yet.
    Idle,
    /// Initial writes in flight.
    Initializing,
    /// The recurring loop is scheduled.
    Running,
    /// Cancellation requested; the loop is winding down.
    Stopping,
    /// Every light was handed back and the name deregistered.
    Released,
}

struct Progress {
    phase: Phase,
    /// Configured lights, in configuration order.
    lights: Vec<EntityId>,
    /// Lights the loop picks from.
    active_lights: Vec<EntityId>,
    color_index: usize,
    /// Lights whose last color asked for brightness-only ticks.
    pending_brightness: HashMap<EntityId, ValueOrRange<u8>>,
}

pub struct Animation<P> {
    id: AnimationId,
    config: StartRequest,
    colors: Vec<ColorSpec>,
    shared: Weak<Shared<P>>,
    progress: Mutex<Progress>,
    rng: Mutex<fastrand::Rng>,
    cancel: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    released: AtomicBool,
}

impl<P: LightPlatform> Animation<P> {
    /// Build an animation from a validated request.
    ///
    /// Colors that cannot be normalized are dropped with a warning and the
    /// configured lights are added right away, so eligibility reflects the
    /// host state at construction time.
    pub(crate) fn new(
        shared: &Arc<Shared<P>>,
        mut config: StartRequest,
        rng: fastrand::Rng,
    ) -> Arc<Self> {
        let colors = std::mem::take(&mut config.colors)
            .into_iter()
            .filter_map(|color| match color.normalized() {
                Ok(color) => Some(color),
                Err(err) => {
                    tracing::warn!(%err, animation = %config.name, "dropping color");
                    None
                }
            })
            .collect();
        let lights = config.lights.clone();
        let (cancel, _) = watch::channel(false);

        let animation = Arc::new(Self {
            id: AnimationId::new(),
            config,
            colors,
            shared: Arc::downgrade(shared),
            progress: Mutex::new(Progress {
                phase: Phase::Idle,
                lights: Vec::new(),
                active_lights: Vec::new(),
                color_index: 0,
                pending_brightness: HashMap::new(),
            }),
            rng: Mutex::new(rng),
            cancel,
            task: Mutex::new(None),
            released: AtomicBool::new(false),
        });
        animation.add_lights(shared.platform(), &lights);
        animation
    }

    #[must_use]
    pub fn id(&self) -> AnimationId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[must_use]
    pub fn priority(&self) -> i64 {
        self.config.priority
    }

    /// The request this animation was started from, with its usable colors.
    #[must_use]
    pub fn config(&self) -> StartRequest {
        StartRequest {
            colors: self.colors.clone(),
            ..self.config.clone()
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        lock(&self.progress).phase
    }

    /// Configured lights.
    #[must_use]
    pub fn lights(&self) -> Vec<EntityId> {
        lock(&self.progress).lights.clone()
    }

    /// Lights the loop currently picks from.
    #[must_use]
    pub fn active_lights(&self) -> Vec<EntityId> {
        lock(&self.progress).active_lights.clone()
    }

    #[must_use]
    pub fn lists_light(&self, light: &EntityId) -> bool {
        lock(&self.progress).lights.contains(light)
    }

    pub(crate) fn restores(&self) -> bool {
        self.config.restore
    }

    pub(crate) fn restores_power(&self) -> bool {
        self.config.restore_power
    }

    fn manager(&self) -> Option<Animations<P>> {
        self.shared.upgrade().map(Animations::from_shared)
    }

    fn set_phase(&self, phase: Phase) {
        let mut progress = lock(&self.progress);
        let settled = matches!(progress.phase, Phase::Stopping | Phase::Released);
        if !settled || phase == Phase::Released {
            progress.phase = phase;
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Add lights to the configured set and, when eligible, to the active set.
    ///
    /// A light the host does not know stays configured but inactive. With
    /// `ignore_off`, a light that is off waits until it is turned on.
    pub(crate) fn add_lights(&self, platform: &P, lights: &[EntityId]) {
        let mut progress = lock(&self.progress);
        for light in lights {
            if !progress.lights.contains(light) {
                progress.lights.push(light.clone());
            }
            if progress.active_lights.contains(light) {
                continue;
            }
            match platform.get_state(light) {
                None => {
                    tracing::warn!(animation = %self.config.name, light = %light, "light not found, not animating it");
                }
                Some(state) if self.config.ignore_off && state.is_off() => {
                    tracing::debug!(animation = %self.config.name, light = %light, "light is off, waiting for it to turn on");
                }
                Some(_) => progress.active_lights.push(light.clone()),
            }
        }
    }

    /// Forget `light` entirely.
    pub(crate) fn remove_light(&self, light: &EntityId) {
        let mut progress = lock(&self.progress);
        progress.lights.retain(|l| l != light);
        progress.active_lights.retain(|l| l != light);
        progress.pending_brightness.remove(light);
    }

    /// Put a configured light back into the active set after it was turned on.
    pub(crate) fn readmit(&self, light: &EntityId) -> bool {
        let mut progress = lock(&self.progress);
        if progress.lights.contains(light) && !progress.active_lights.contains(light) {
            progress.active_lights.push(light.clone());
            return true;
        }
        false
    }

    /// Apply the scene to every active light, then either schedule the loop
    /// or, for a one-shot scene, release right away. A one-shot scene that
    /// restores puts its snapshots straight back, so a persistent scene
    /// needs `restore: false`.
    pub(crate) async fn start(self: &Arc<Self>) {
        self.set_phase(Phase::Initializing);
        self.update_all(self.active_lights(), true).await;

        if self.is_cancelled() {
            self.release().await;
            return;
        }
        if !self.config.is_recurring() {
            tracing::info!(animation = %self.config.name, "no change frequency, scene applied once");
            self.release().await;
            return;
        }

        let scheduled = {
            let mut task = lock(&self.task);
            if task.is_some() {
                false
            } else {
                self.set_phase(Phase::Running);
                let this = Arc::clone(self);
                *task = Some(tokio::spawn(async move { this.animate().await }));
                true
            }
        };
        if scheduled && let Some(manager) = self.manager() {
            manager.events().emit(AnimationEvent::started(self.name()));
        }
    }

    /// Request cancellation and wait for the loop to hand its lights back.
    pub async fn stop(&self) {
        self.set_phase(Phase::Stopping);
        self.cancel.send_replace(true);
        let handle = lock(&self.task).take();
        if let Some(handle) = handle
            && let Err(err) = handle.await
        {
            tracing::warn!(%err, animation = %self.config.name, "animation loop ended abnormally");
            self.release().await;
        }
    }

    async fn animate(self: Arc<Self>) {
        let mut cancel = self.cancel.subscribe();
        tracing::info!(animation = %self.config.name, "animation loop started");
        loop {
            let cancelled = *cancel.borrow_and_update();
            if cancelled || !self.is_registered() {
                break;
            }
            self.update_lights().await;
            let delay = self.next_delay();
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = cancel.changed() => {}
            }
        }
        tracing::info!(animation = %self.config.name, "animation loop finished");
        self.release().await;
    }

    fn is_registered(&self) -> bool {
        self.manager()
            .is_some_and(|manager| manager.is_registered(self.id, self.name()))
    }

    fn next_delay(&self) -> Duration {
        let seconds = self
            .config
            .change_frequency
            .map_or(0.0, |frequency| frequency.sample(&mut lock(&self.rng)));
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
    }

    /// One tick: pick `change_amount` lights and rewrite them.
    pub(crate) async fn update_lights(self: &Arc<Self>) {
        if self.is_cancelled() {
            return;
        }
        let Some(manager) = self.manager() else {
            return;
        };
        let picked = {
            let mut progress = lock(&self.progress);
            let mut rng = lock(&self.rng);
            let count = self
                .config
                .change_amount
                .resolve(progress.active_lights.len(), &mut rng);
            if count == 0 {
                return;
            }
            if self.config.change_sequence && !self.colors.is_empty() {
                progress.color_index = (progress.color_index + 1) % self.colors.len();
            }
            self.pick_lights(manager.platform(), &progress.active_lights, count, &mut rng)
        };
        self.update_all(picked, false).await;
    }

    /// Sample `count` distinct lights from `active`.
    ///
    /// With `ignore_off`, lights reported off are dropped from the sample
    /// rather than replaced, so fewer than `count` may come back.
    fn pick_lights(
        &self,
        platform: &P,
        active: &[EntityId],
        count: usize,
        rng: &mut fastrand::Rng,
    ) -> Vec<EntityId> {
        let mut picked = active.to_vec();
        rng.shuffle(&mut picked);
        picked.truncate(count);
        if self.config.ignore_off {
            picked.retain(|light| match platform.get_state(light) {
                Some(state) => !state.is_off(),
                None => {
                    tracing::warn!(animation = %self.config.name, light = %light, "light not found, skipping");
                    false
                }
            });
        }
        picked
    }

    async fn update_all(self: &Arc<Self>, lights: Vec<EntityId>, initial: bool) {
        let mut updates = JoinSet::new();
        for light in lights {
            let this = Arc::clone(self);
            updates.spawn(async move { this.update_light(&light, initial).await });
        }
        while let Some(result) = updates.join_next().await {
            if let Err(err) = result {
                tracing::warn!(%err, animation = %self.config.name, "light update task failed");
            }
        }
    }

    /// Write the next state of one light, unless another animation owns it.
    pub(crate) async fn update_light(&self, light: &EntityId, initial: bool) {
        let Some(manager) = self.manager() else {
            return;
        };
        if !manager.is_owner(light, self.id) {
            tracing::info!(animation = %self.config.name, light = %light, "light is owned by another animation, skipping");
            return;
        }
        let command = self.build_light_attributes(light, initial);
        tracing::debug!(animation = %self.config.name, light = %light, ?command, "updating light");
        safe_call(manager.platform(), ServiceCall::turn_on(command)).await;
    }

    /// The `light.turn_on` payload for the next write to `light`.
    pub(crate) fn build_light_attributes(&self, light: &EntityId, initial: bool) -> LightCommand {
        let mut progress = lock(&self.progress);
        let mut rng = lock(&self.rng);
        let mut command =
            LightCommand::new(light.clone()).with_transition(self.config.transition.sample(&mut rng));

        if let Some(brightness) = progress.pending_brightness.get(light).copied()
            && rng.bool()
        {
            return command.with_brightness(brightness.sample(&mut rng));
        }

        let color = self.pick_color(progress.color_index, &mut rng);
        match color {
            Some(color) => {
                if self.config.animate_color || initial {
                    let value = if color.nearby_range > 0 {
                        find_nearby_color(&color.value, color.nearby_range, &mut rng)
                    } else {
                        color.value
                    };
                    command = command.with_color(value);
                }
                match color.brightness {
                    Some(brightness) if color.one_change_per_tick => {
                        progress.pending_brightness.insert(light.clone(), brightness);
                    }
                    _ => {
                        progress.pending_brightness.remove(light);
                    }
                }
            }
            None => {
                progress.pending_brightness.remove(light);
            }
        }

        let brightness = color
            .and_then(|color| color.brightness)
            .unwrap_or(self.config.brightness);
        if self.config.animate_brightness {
            command = command.with_brightness(brightness.sample(&mut rng));
        } else if let Some(fixed) = brightness.fixed() {
            command = command.with_brightness(fixed);
        } else {
            tracing::warn!(animation = %self.config.name, "brightness range ignored while brightness animation is off");
        }
        command
    }

    /// The sequence color at `index`, or a weighted random one.
    fn pick_color(&self, index: usize, rng: &mut fastrand::Rng) -> Option<&ColorSpec> {
        if self.colors.is_empty() {
            return None;
        }
        if self.config.change_sequence {
            return self.colors.get(index);
        }
        let total: u32 = self.colors.iter().map(|color| u32::from(color.weight)).sum();
        if total == 0 {
            return self.colors.get(rng.usize(..self.colors.len()));
        }
        let mut roll = rng.u32(..total);
        for color in &self.colors {
            let weight = u32::from(color.weight);
            if roll < weight {
                return Some(color);
            }
            roll -= weight;
        }
        self.colors.last()
    }

    /// Hand every configured light back, deregister and notify.
    ///
    /// Runs at most once.
    pub(crate) async fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        let lights = {
            let mut progress = lock(&self.progress);
            progress.phase = Phase::Released;
            progress.lights.clone()
        };
        let Some(manager) = self.manager() else {
            return;
        };
        for light in &lights {
            manager.release_light(self, light, false, false).await;
        }
        manager.release_animation(self);
        manager.events().emit(AnimationEvent::stopped(self.name()));
        tracing::info!(animation = %self.config.name, "animation released");
    }
}

impl<P> std::fmt::Debug for Animation<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animation")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("priority", &self.config.priority)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockPlatform, id, recurring};
    use animated_scenes_domain::color::ColorValue;
    use animated_scenes_domain::light::EntityState;

    type TestAnimation = Arc<Animation<Arc<MockPlatform>>>;

    fn build(request: StartRequest) -> (Animations<Arc<MockPlatform>>, TestAnimation) {
        let platform = MockPlatform::with_lights(&[
            ("light.a", EntityState::On),
            ("light.b", EntityState::Off),
        ]);
        let animations = Animations::with_seed(platform, 11);
        let animation = Animation::new(animations.shared(), request, fastrand::Rng::with_seed(3));
        (animations, animation)
    }

    fn with_colors(colors: Vec<ColorSpec>) -> StartRequest {
        let mut request = recurring("party", &["light.a"], 5.0);
        request.colors = colors;
        request
    }

    #[tokio::test]
    async fn should_drop_colors_that_cannot_be_normalized() {
        let (_animations, animation) = build(with_colors(vec![
            ColorSpec::new(ColorValue::ColorTempMireds(0)),
            ColorSpec::new(ColorValue::ColorTempMireds(250)),
        ]));
        let colors = animation.config().colors;
        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].value, ColorValue::ColorTempKelvin(4000));
    }

    #[tokio::test]
    async fn should_keep_unknown_and_off_lights_out_of_active_set() {
        let (_animations, animation) =
            build(recurring("party", &["light.a", "light.b", "light.missing"], 5.0));
        assert_eq!(animation.lights().len(), 3);
        assert_eq!(animation.active_lights(), vec![id("light.a")]);
        assert_eq!(animation.phase(), Phase::Idle);

        assert!(animation.readmit(&id("light.b")));
        assert!(!animation.readmit(&id("light.b")));
        assert!(!animation.readmit(&id("light.other")));
    }

    #[tokio::test]
    async fn should_pick_fewer_lights_when_one_was_turned_off() {
        let platform = MockPlatform::with_lights(&[
            ("light.a", EntityState::On),
            ("light.c", EntityState::On),
        ]);
        let animations = Animations::with_seed(Arc::clone(&platform), 11);
        let animation = Animation::new(
            animations.shared(),
            recurring("party", &["light.a", "light.c"], 5.0),
            fastrand::Rng::with_seed(3),
        );
        assert_eq!(animation.active_lights().len(), 2);

        platform.set_externally("light.c", EntityState::Off);

        let picked = animation.pick_lights(
            animations.platform(),
            &animation.active_lights(),
            2,
            &mut fastrand::Rng::with_seed(1),
        );
        assert_eq!(picked, vec![id("light.a")]);
        assert_eq!(animation.active_lights().len(), 2);
    }

    #[tokio::test]
    async fn should_only_send_color_on_initial_write_when_color_is_not_animated() {
        let mut request = with_colors(vec![ColorSpec::new(ColorValue::Rgb([0, 0, 255]))]);
        request.animate_color = false;
        let (_animations, animation) = build(request);

        let initial = animation.build_light_attributes(&id("light.a"), true);
        assert_eq!(initial.rgb_color, Some([0, 0, 255]));
        let tick = animation.build_light_attributes(&id("light.a"), false);
        assert_eq!(tick.color(), None);
        assert_eq!(tick.brightness, Some(255));
        assert_eq!(tick.transition, Some(1.0));
    }

    #[tokio::test]
    async fn should_sample_color_brightness_before_global_brightness() {
        let color = ColorSpec::new(ColorValue::Rgb([0, 255, 0]))
            .with_brightness(ValueOrRange::Range(10, 20));
        let (_animations, animation) = build(with_colors(vec![color]));

        for _ in 0..20 {
            let command = animation.build_light_attributes(&id("light.a"), false);
            let brightness = command.brightness.unwrap();
            assert!((10..=20).contains(&brightness), "{brightness}");
        }
    }

    #[tokio::test]
    async fn should_send_scalar_brightness_when_brightness_is_not_animated() {
        let mut request = recurring("party", &["light.a"], 5.0);
        request.animate_brightness = false;
        request.brightness = ValueOrRange::Fixed(42);
        let (_animations, animation) = build(request);
        let command = animation.build_light_attributes(&id("light.a"), false);
        assert_eq!(command.brightness, Some(42));

        let mut request = recurring("party", &["light.a"], 5.0);
        request.animate_brightness = false;
        request.brightness = ValueOrRange::Range(10, 200);
        let (_animations, animation) = build(request);
        let command = animation.build_light_attributes(&id("light.a"), false);
        assert_eq!(command.brightness, None);
    }

    #[tokio::test]
    async fn should_send_only_brightness_and_transition_without_colors() {
        let (_animations, animation) = build(recurring("party", &["light.a"], 5.0));
        let command = animation.build_light_attributes(&id("light.a"), true);
        assert_eq!(command.color(), None);
        assert_eq!(command.brightness, Some(255));
        assert_eq!(command.transition, Some(1.0));
    }

    #[tokio::test]
    async fn should_alternate_brightness_only_ticks_for_one_change_colors() {
        let color = ColorSpec::new(ColorValue::Rgb([255, 128, 0]))
            .with_brightness(ValueOrRange::Fixed(77))
            .with_one_change_per_tick(true);
        let (_animations, animation) = build(with_colors(vec![color]));

        let first = animation.build_light_attributes(&id("light.a"), false);
        assert_eq!(first.rgb_color, Some([255, 128, 0]));

        let commands: Vec<_> = (0..32)
            .map(|_| animation.build_light_attributes(&id("light.a"), false))
            .collect();
        assert!(commands.iter().all(|c| c.brightness == Some(77)));
        assert!(commands.iter().any(|c| c.color().is_none()));
        assert!(commands.iter().any(|c| c.color().is_some()));
    }

    #[tokio::test]
    async fn should_never_pick_zero_weight_color_when_others_weigh_more() {
        let (_animations, animation) = build(with_colors(vec![
            ColorSpec::new(ColorValue::Rgb([1, 1, 1])).with_weight(0),
            ColorSpec::new(ColorValue::Rgb([2, 2, 2])).with_weight(5),
        ]));
        for _ in 0..50 {
            let command = animation.build_light_attributes(&id("light.a"), false);
            assert_eq!(command.rgb_color, Some([2, 2, 2]));
        }
    }

    #[tokio::test]
    async fn should_pick_uniformly_when_every_weight_is_zero() {
        let (_animations, animation) = build(with_colors(vec![
            ColorSpec::new(ColorValue::Rgb([1, 1, 1])).with_weight(0),
            ColorSpec::new(ColorValue::Rgb([2, 2, 2])).with_weight(0),
        ]));
        let seen: Vec<_> = (0..50)
            .filter_map(|_| animation.build_light_attributes(&id("light.a"), false).rgb_color)
            .collect();
        assert!(seen.contains(&[1, 1, 1]));
        assert!(seen.contains(&[2, 2, 2]));
    }

    #[tokio::test]
    async fn should_stay_close_to_configured_color_with_nearby_range() {
        let color = ColorSpec::new(ColorValue::Rgb([100, 100, 100])).with_nearby_range(5);
        let (_animations, animation) = build(with_colors(vec![color]));
        for _ in 0..20 {
            let rgb = animation
                .build_light_attributes(&id("light.a"), false)
                .rgb_color
                .unwrap();
            assert!(rgb.iter().all(|c| (70..=130).contains(c)), "{rgb:?}");
        }
    }
}
