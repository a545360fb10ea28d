//! Server-Sent Events (SSE) stream of animation lifecycle events.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use animated_scenes_app::ports::LightPlatform;

use crate::state::AppState;

/// `GET /api/events`: `started` / `stopped` events as JSON `data:` frames.
///
/// The stream continues until the client disconnects. A lagging client
/// skips the events it missed.
pub async fn stream<P: LightPlatform>(
    State(state): State<AppState<P>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let event_rx = state.animation_service.animations().subscribe_events();
    let event_stream = BroadcastStream::new(event_rx).filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(Event::default().event("animation").data(json))),
            Err(err) => {
                tracing::warn!(%err, "failed to serialize animation event for SSE stream");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(skipped = n, "SSE subscriber lagged, some events were dropped");
            None
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
