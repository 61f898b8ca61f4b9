//! JSON wire protocol for the relay WebSocket.
//!
//! Events are tagged JSON objects carried in Text frames. Event names and
//! field casing match what the browser client speaks (`sendMessage`,
//! `getOnlineUsers`, ...). Payloads are opaque to the relay: an image is a
//! reference string and a voice note is an object-storage URL, never raw
//! bytes.

use serde::{Deserialize, Serialize};

use crate::chat::relay;
use crate::state::AppState;

/// Addressed events emitted by an identified client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Chat message: text and/or an image reference.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        receiver_id: String,
        text: Option<String>,
        image: Option<String>,
    },
    /// Voice-note notification. The audio already lives in object storage;
    /// only its URL and name travel through the relay.
    #[serde(rename_all = "camelCase")]
    SendVoiceNote {
        receiver_id: String,
        file_url: String,
        file_name: String,
    },
}

impl ClientEvent {
    /// Wire name of the event, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SendMessage { .. } => "sendMessage",
            Self::SendVoiceNote { .. } => "sendVoiceNote",
        }
    }
}

/// Events pushed from the server to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Full online set, re-sent after every registry change.
    #[serde(rename_all = "camelCase")]
    GetOnlineUsers { user_ids: Vec<String> },
    /// Forwarded chat message.
    #[serde(rename_all = "camelCase")]
    NewMessage {
        sender_id: String,
        text: Option<String>,
        image: Option<String>,
    },
    /// Forwarded voice-note notification.
    #[serde(rename_all = "camelCase")]
    ReceiveVoiceNote {
        sender_id: String,
        file_url: String,
        file_name: String,
    },
}

/// Handle an incoming Text frame: decode the client event and route it.
/// Undecodable frames are dropped with a warning; the connection stays open.
/// Events from a connection that never identified are dropped the same way.
pub fn handle_text_frame(raw: &str, state: &AppState, user_id: Option<&str>) {
    let event = match serde_json::from_str::<ClientEvent>(raw) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decode client event");
            return;
        }
    };

    match user_id {
        Some(sender_id) => relay::route(&state.connections, sender_id, event),
        None => {
            tracing::warn!(
                event = event.kind(),
                "Dropping event from unidentified connection"
            );
        }
    }
}
