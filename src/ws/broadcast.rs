use axum::extract::ws::Message;

use super::protocol::ServerEvent;
use super::{ConnectionRegistry, ConnectionSender};
use crate::chat::presence;

/// Outcome of a point-to-point send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the receiver's outbound channel.
    Sent,
    /// No registered connection for the receiver.
    Offline,
    /// The receiver's connection is dead; its entry has been evicted and the
    /// updated online set announced.
    Failed,
}

fn encode(event: &ServerEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server event");
            None
        }
    }
}

/// Push one event onto a specific connection's queue.
/// Returns whether the push succeeded.
pub fn send_to_handle(tx: &ConnectionSender, event: &ServerEvent) -> bool {
    match encode(event) {
        Some(msg) => tx.send(msg).is_ok(),
        None => false,
    }
}

/// Send an event to one user's connection, if registered.
/// The send is a non-blocking queue push; a failed push means the actor's
/// writer task is gone. That is an implicit disconnect: the stale entry is
/// removed and the shrunken online set is broadcast right away, since the
/// dying actor's handle-guarded cleanup will find the entry already gone.
pub fn send_to_user(registry: &ConnectionRegistry, user_id: &str, event: &ServerEvent) -> Delivery {
    let Some(msg) = encode(event) else {
        return Delivery::Failed;
    };

    match registry.lookup(user_id) {
        Some(tx) => {
            if tx.send(msg).is_ok() {
                Delivery::Sent
            } else {
                if registry.unregister(user_id, &tx) {
                    presence::broadcast_online_users(registry);
                }
                Delivery::Failed
            }
        }
        None => Delivery::Offline,
    }
}

/// Broadcast an event to every open connection, registered or not.
/// Best-effort: no acknowledgment is awaited, and a dead peer is evicted
/// rather than retried. Returns how many registry entries were evicted so
/// the caller can re-announce the online set; dead unidentified connections
/// are detached without affecting presence.
pub fn broadcast_to_all(registry: &ConnectionRegistry, event: &ServerEvent) -> usize {
    let Some(msg) = encode(event) else {
        return 0;
    };

    let mut evicted = 0;
    for (user_id, tx) in registry.connections() {
        if tx.send(msg.clone()).is_err() && registry.unregister(&user_id, &tx) {
            evicted += 1;
        }
    }

    for (guest_id, tx) in registry.unidentified_connections() {
        if tx.send(msg.clone()).is_err() {
            registry.detach_unidentified(guest_id);
        }
    }

    evicted
}
