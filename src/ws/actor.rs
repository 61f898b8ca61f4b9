use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::chat::presence;
use crate::state::AppState;
use crate::ws::protocol;

/// Ping interval: server sends WebSocket ping every 30 seconds.
/// Prevents connection leaks from abrupt disconnects.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Pong timeout: if pong not received within 10 seconds after ping, close.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Close code sent to a connection superseded by a newer one under the same
/// identity (last connection wins).
const CLOSE_SESSION_REPLACED: u16 = 4000;

/// Run the actor-per-connection pattern for a WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader task: processes incoming messages, dispatches to the relay
///
/// The mpsc channel allows any part of the system to push messages to this
/// client by cloning the sender, without ever blocking on the socket.
///
/// With `user_id` present the connection is registered and the updated online
/// set is broadcast before any event is read; registration and broadcast run
/// in this task, so the broadcast always reflects the completed mutation.
/// Without an identity the connection is served (ping/pong, close) but no
/// events are routed for it.
pub async fn run_connection(socket: WebSocket, state: AppState, user_id: Option<String>) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let mut guest_id = None;

    if let Some(id) = user_id.as_deref() {
        // Register this connection; a superseded connection under the same
        // identity is closed rather than leaked.
        if let Some(old) = state.connections.register(id, tx.clone()) {
            tracing::info!(user_id = %id, "Replacing earlier connection for identity");
            let _ = old.send(Message::Close(Some(CloseFrame {
                code: CLOSE_SESSION_REPLACED,
                reason: "Session replaced".into(),
            })));
        }

        // Announce the updated online set to everyone, including the new
        // client (its initial snapshot).
        presence::broadcast_online_users(&state.connections);

        tracing::info!(user_id = %id, "WebSocket actor started");
    } else {
        // No identity: track the connection so broadcasts still reach it,
        // and hand it the current online set as its initial snapshot.
        let id = state.connections.attach_unidentified(tx.clone());
        presence::send_online_snapshot(&state.connections, &tx);

        tracing::info!(guest_id = id, "WebSocket actor started for unidentified connection");
        guest_id = Some(id);
    }

    // Spawn writer task: forwards mpsc messages to WebSocket sink
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Track pong reception
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();

    // Spawn ping task: sends periodic pings and monitors pong responses
    let ping_tx = tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died — connection is gone
                break;
            }

            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {
                    // Pong received, continue
                }
                _ => {
                    tracing::warn!("Pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop: process incoming WebSocket messages
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    protocol::handle_text_frame(&text, &state, user_id.as_deref());
                }
                Message::Binary(_) => {
                    // The protocol is JSON over Text frames
                    tracing::debug!(
                        user_id = ?user_id,
                        "Received binary message (expected JSON text)"
                    );
                }
                Message::Pong(_) => {
                    // Pong received — notify the ping task
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    // Respond to client pings with pong
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(
                        user_id = ?user_id,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    user_id = ?user_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                // Stream ended — client disconnected
                tracing::info!(user_id = ?user_id, "WebSocket stream ended");
                break;
            }
        }
    }

    // Cleanup: abort writer and ping tasks
    writer_handle.abort();
    ping_handle.abort();

    if let Some(id) = user_id.as_deref() {
        // Handle-guarded removal: if a newer connection already replaced this
        // entry, or a failed send already evicted it (and announced the
        // shrunken set), leave the registry alone and skip the re-broadcast.
        if state.connections.unregister(id, &tx) {
            presence::broadcast_online_users(&state.connections);
        }

        tracing::info!(user_id = %id, "WebSocket actor stopped");
    } else if let Some(guest_id) = guest_id {
        state.connections.detach_unidentified(guest_id);

        tracing::info!(guest_id, "WebSocket actor stopped");
    }
}

/// Writer task: receives messages from mpsc channel and forwards them to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}
