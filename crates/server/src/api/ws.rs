//! WebSocket support for live status updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use claimer_core::AppState;
use futures::{stream::SplitStream, Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_MESSAGES_SENT};
use crate::state::ServerState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket message sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// A new status snapshot was published.
    StateUpdate { state: AppState },
    /// The orchestrator went from running to stopped.
    RunFinished,
    /// Server heartbeat (sent periodically to keep connection alive).
    Heartbeat { timestamp: i64 },
}

impl WsMessage {
    fn kind(&self) -> &'static str {
        match self {
            WsMessage::StateUpdate { .. } => "state_update",
            WsMessage::RunFinished => "run_finished",
            WsMessage::Heartbeat { .. } => "heartbeat",
        }
    }

    /// Messages for a newly observed snapshot, given whether the previous
    /// one was running.
    pub fn for_update(was_running: bool, state: &AppState) -> Vec<WsMessage> {
        let mut messages = vec![WsMessage::StateUpdate {
            state: state.clone(),
        }];
        if was_running && !state.running {
            messages.push(WsMessage::RunFinished);
        }
        messages
    }
}

/// WebSocket upgrade handler.
///
/// The connection only keeps a status receiver and the shutdown watch, never
/// the server state itself.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let updates = state.orchestrator().status().subscribe();
    let shutdown = state.shutdown_watch();
    ws.on_upgrade(move |socket| handle_socket(socket, updates, shutdown))
}

async fn send<S>(sender: &mut S, msg: &WsMessage) -> bool
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => {
            WS_MESSAGES_SENT.with_label_values(&[msg.kind()]).inc();
            sender.send(Message::Text(json.into())).await.is_ok()
        }
        Err(e) => {
            error!("Failed to serialize WsMessage: {}", e);
            true
        }
    }
}

/// Resolves once shutdown begins or the server state is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|down| *down).await;
}

/// Forward snapshots and heartbeats to the client until it goes away or the
/// server shuts down. On shutdown a close frame is sent.
async fn pump_updates<S>(
    mut sender: S,
    mut rx: watch::Receiver<AppState>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: Sink<Message> + Unpin,
{
    // Current snapshot first so the client never starts blank
    let initial = rx.borrow_and_update().clone();
    let mut was_running = initial.running;
    if !send(&mut sender, &WsMessage::StateUpdate { state: initial }).await {
        return;
    }

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    debug!("Status publisher closed");
                    return;
                }
                let snapshot = rx.borrow_and_update().clone();
                for msg in WsMessage::for_update(was_running, &snapshot) {
                    if !send(&mut sender, &msg).await {
                        debug!("WebSocket send failed, client disconnected");
                        return;
                    }
                }
                was_running = snapshot.running;
            }
            _ = heartbeat.tick() => {
                let msg = WsMessage::Heartbeat {
                    timestamp: chrono::Utc::now().timestamp(),
                };
                if !send(&mut sender, &msg).await {
                    debug!("WebSocket send failed, client disconnected");
                    return;
                }
            }
            _ = shutdown_requested(&mut shutdown) => {
                debug!("Server shutting down, closing WebSocket");
                let _ = sender.send(Message::Close(None)).await;
                return;
            }
        }
    }
}

/// Drain client frames until it closes the connection.
async fn read_client(mut receiver: SplitStream<WebSocket>) {
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                debug!("Ignoring client message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }
}

/// Handle a single WebSocket connection.
async fn handle_socket(
    socket: WebSocket,
    updates: watch::Receiver<AppState>,
    shutdown: watch::Receiver<bool>,
) {
    let (sender, receiver) = socket.split();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected");

    let mut send_task = tokio::spawn(pump_updates(sender, updates, shutdown));

    tokio::select! {
        _ = &mut send_task => {}
        _ = read_client(receiver) => {}
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}
