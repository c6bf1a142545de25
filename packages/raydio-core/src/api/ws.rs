//! WebSocket handler for real-time client communication.
//!
//! Each connection receives the session snapshot on connect and after every
//! change, plus every [`crate::events::BroadcastEvent`] as JSON text frames.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use crate::api::AppState;
use crate::services::SessionSnapshot;

/// Snapshot frame, tagged like the broadcast events.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateMessage<'a> {
    category: &'static str,
    snapshot: &'a SessionSnapshot,
}

impl<'a> StateMessage<'a> {
    fn new(snapshot: &'a SessionSnapshot) -> Self {
        Self {
            category: "state",
            snapshot,
        }
    }

    fn to_message(&self) -> Option<Message> {
        serde_json::to_string(self)
            .inspect_err(|e| log::error!("[WS] Failed to serialize snapshot: {}", e))
            .ok()
            .map(|s| Message::Text(s.into()))
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut broadcast_rx = state.broadcast_tx.subscribe();
    let mut snapshots = Box::pin(state.session.snapshots());
    let cancel_token = state.cancel_token.clone();

    log::info!("[WS] New connection established");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                log::info!("[WS] Closing connection on shutdown");
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Clients only listen; anything else is ignored.
                _ => {}
            },
            snapshot = snapshots.next() => {
                let Some(snapshot) = snapshot else { break };
                if let Some(msg) = StateMessage::new(&snapshot).to_message() {
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
            }
            event = broadcast_rx.recv() => match event {
                Ok(event) => {
                    if let Ok(json) = serde_json::to_string(&event) {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    log::warn!("[WS] Client lagged, skipped {} event(s)", n);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    log::info!("[WS] Connection closed");
}
