//! Downstream WebSocket server
//!
//! Accepts client connections, parses tagged subscribe frames, and
//! forwards relay pushes out to the socket. Each connection gets a
//! process-unique client id and an unbounded outbound channel; the
//! connection task is the only writer to its socket. On transport close
//! (either direction) the task sends exactly one Disconnect so the
//! registry drops every subscription for this client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::any;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;
use types::protocol::ClientRequest;

use crate::registry::ClientId;
use crate::relay::RelayCommand;

/// Shared handle given to every connection task.
pub struct ServerState {
    commands: mpsc::UnboundedSender<RelayCommand>,
    next_client_id: AtomicU64,
}

impl ServerState {
    pub fn new(commands: mpsc::UnboundedSender<RelayCommand>) -> Arc<Self> {
        Arc::new(Self {
            commands,
            next_client_id: AtomicU64::new(1),
        })
    }

    fn allocate_client_id(&self) -> ClientId {
        self.next_client_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Build the router exposing the subscriber endpoint at `/ws`.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new().route("/ws", any(ws_handler)).with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let client_id = state.allocate_client_id();
    debug!(client_id, "subscriber connected");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    loop {
        tokio::select! {
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientRequest>(text.as_str()) {
                            Ok(ClientRequest::SubscribeOrderbook { symbol }) => {
                                let command = RelayCommand::Subscribe {
                                    symbol,
                                    client_id,
                                    sender: tx.clone(),
                                };
                                if state.commands.send(command).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                debug!(client_id, error = %e, "dropping unrecognized client frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // binary/ping/pong: nothing to do
                    Some(Err(e)) => {
                        debug!(client_id, error = %e, "client transport error");
                        break;
                    }
                }
            }

            payload = rx.recv() => {
                match payload {
                    Some(payload) => {
                        if sender.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    // Relay gone; nothing left to forward.
                    None => break,
                }
            }
        }
    }

    let _ = state
        .commands
        .send(RelayCommand::Disconnect { client_id });
    debug!(client_id, "subscriber context closed");
}
