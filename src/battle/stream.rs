use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, instrument};

use crate::event::EventBus;
use crate::shared::AppState;

/// WebSocket endpoint streaming a battle's events to a client
///
/// GET /battles/:battle_id/events
///
/// Push-based: clients see lobby joins, round completions, and settlement
/// as they happen instead of polling battle state.
#[instrument(name = "battle_events", skip(ws, state))]
pub async fn battle_events(
    ws: WebSocketUpgrade,
    Path(battle_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    info!(battle_id = %battle_id, "Battle event stream requested");
    ws.on_upgrade(move |socket| forward_events(socket, state.event_bus, battle_id))
}

async fn forward_events(mut socket: WebSocket, event_bus: EventBus, battle_id: String) {
    let mut receiver = event_bus.subscribe(&battle_id).await;

    loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Ok(event) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(e) => {
                            debug!(battle_id = %battle_id, error = %e, "Failed to serialize event");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(payload)).await.is_err() {
                        debug!(battle_id = %battle_id, "Client disconnected");
                        break;
                    }
                }
                // A slow client missing events is not fatal; keep streaming
                Err(RecvError::Lagged(skipped)) => {
                    debug!(battle_id = %battle_id, skipped = skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
            message = socket.recv() => match message {
                // Inbound messages are ignored; the stream is one-way
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }

    debug!(battle_id = %battle_id, "Battle event stream closed");
}
