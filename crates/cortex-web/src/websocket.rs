//! Step streaming over WebSocket
//!
//! One connection follows one request id. Each socket gets its own
//! listener on `step:<request_id>` and sees only events published after it
//! connected, so clients connect before posting the chat request.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use cortex_core::step_topic;
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// GET /ws/steps/:request_id
pub async fn steps_websocket(
    ws: WebSocketUpgrade,
    Path(request_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, request_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, request_id: String) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.bus.iterate(&step_topic(&request_id));
    info!(request_id = %request_id, "Step subscriber connected");

    loop {
        tokio::select! {
            event = events.next_event() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize step update");
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(other)) => debug!(?other, "Ignoring client frame"),
                }
            }
        }
    }

    events.close();
    info!(request_id = %request_id, "Step subscriber disconnected");
}
