//! WebSocket route forwarding hub events to connected clients.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::interval;

use crate::hub::EventHub;

const PING_INTERVAL_SECS: u64 = 30;

/// Builds the `/ws` route over a hub clone. Mounted by the server next to
/// the REST API.
pub fn router(hub: EventHub) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(hub)
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<EventHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Pushes every hub event to one client until it disconnects.
///
/// The connection is one-way: incoming text frames are ignored, pings keep
/// the connection alive. A client that lags behind the broadcast buffer
/// loses the missed events and is expected to re-sync via the REST list.
async fn handle_socket(socket: WebSocket, hub: EventHub) {
    let mut events = hub.subscribe();
    let (mut ws_tx, mut ws_rx) = socket.split();

    tracing::info!(
        subscribers = hub.subscriber_count(),
        "push client connected"
    );

    let mut ping = interval(Duration::from_secs(PING_INTERVAL_SECS));
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if ws_tx.send(Message::Text(event.to_frame().into())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "push client lagged; dropped events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Pongs and stray client frames carry no meaning here.
                    Some(Ok(_)) => {}
                }
            }

            _ = ping.tick() => {
                if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!("push client disconnected");
}
