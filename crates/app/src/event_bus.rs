//! In-process event bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use animated_scenes_domain::event::AnimationEvent;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped).
#[derive(Clone)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<AnimationEvent>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AnimationEvent> {
        self.sender.subscribe()
    }

    /// Publish `event` to every current subscriber.
    pub(crate) fn emit(&self, event: AnimationEvent) {
        // zero receivers is not an error
        let _ = self.sender.send(event);
    }
}
