//! Step streaming over Server-Sent Events

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use cortex_core::step_topic;
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::state::AppState;

/// GET /api/steps/:request_id
///
/// Emits one `step` event per update. The listener is removed when the
/// client goes away and the stream is dropped.
pub async fn steps_sse(
    Path(request_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut events = state.bus.iterate(&step_topic(&request_id));
    info!(request_id = %request_id, "SSE step subscriber connected");

    let stream = async_stream::stream! {
        while let Some(update) = events.next_event().await {
            match Event::default().event("step").json_data(&update) {
                Ok(event) => yield Ok(event),
                Err(e) => warn!(error = %e, "Failed to encode step update"),
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
}
