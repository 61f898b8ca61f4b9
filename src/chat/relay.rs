//! Point-to-point relay of addressed events.
//!
//! Looks up the receiver in the connection registry and forwards the payload,
//! re-tagged with the sender identity so the receiving client can dispatch on
//! event kind. Events addressed to offline users are dropped with no feedback
//! to the sender: this is fire-and-forget signaling, not guaranteed delivery.
//! Durable history, if any, is owned by an external message store.

use crate::ws::broadcast::{send_to_user, Delivery};
use crate::ws::protocol::{ClientEvent, ServerEvent};
use crate::ws::ConnectionRegistry;

/// Route one addressed event from `sender_id` to its receiver.
/// Never fails: an offline or dead receiver degrades to a dropped event.
pub fn route(registry: &ConnectionRegistry, sender_id: &str, event: ClientEvent) {
    let kind = event.kind();

    let (receiver_id, outbound) = match event {
        ClientEvent::SendMessage {
            receiver_id,
            text,
            image,
        } => (
            receiver_id,
            ServerEvent::NewMessage {
                sender_id: sender_id.to_string(),
                text,
                image,
            },
        ),
        ClientEvent::SendVoiceNote {
            receiver_id,
            file_url,
            file_name,
        } => (
            receiver_id,
            ServerEvent::ReceiveVoiceNote {
                sender_id: sender_id.to_string(),
                file_url,
                file_name,
            },
        ),
    };

    match send_to_user(registry, &receiver_id, &outbound) {
        Delivery::Sent => {
            tracing::debug!(
                event = kind,
                sender_id = %sender_id,
                receiver_id = %receiver_id,
                "Relayed event"
            );
        }
        Delivery::Offline => {
            // Receiver not connected: normal condition, not a fault
            tracing::debug!(
                event = kind,
                sender_id = %sender_id,
                receiver_id = %receiver_id,
                "Receiver offline, event dropped"
            );
        }
        Delivery::Failed => {
            tracing::warn!(
                event = kind,
                sender_id = %sender_id,
                receiver_id = %receiver_id,
                "Receiver connection dead, event dropped"
            );
        }
    }
}
