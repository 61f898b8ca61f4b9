//! Server-side presence broadcast.
//!
//! The online set is derived from the connection registry keys, never stored
//! separately. After every registry mutation the full set is re-broadcast to
//! all open connections; there are no incremental diffs.

use crate::ws::broadcast::{broadcast_to_all, send_to_handle};
use crate::ws::protocol::ServerEvent;
use crate::ws::{ConnectionRegistry, ConnectionSender};

/// Broadcast the current online set to every open connection.
/// Called after each register/unregister and after any eviction of a dead
/// entry, so all clients converge on the same view of who is online.
///
/// The fan-out itself can discover dead peers; evicting one shrinks the
/// online set, which must be announced in turn. Each extra pass removes at
/// least one entry, so the loop terminates. Snapshot and fan-out run under
/// the registry's broadcast guard so queues receive sets in snapshot order.
pub fn broadcast_online_users(registry: &ConnectionRegistry) {
    loop {
        let evicted = {
            let _guard = registry.broadcast_guard();
            let user_ids = registry.online_users();

            tracing::debug!(online = user_ids.len(), "Broadcasting online users");

            broadcast_to_all(registry, &ServerEvent::GetOnlineUsers { user_ids })
        };

        if evicted == 0 {
            break;
        }
    }
}

/// Send the current online set to a single connection: the initial snapshot
/// for clients that are not in the registry themselves (unidentified
/// connections receive broadcasts but never trigger one).
pub fn send_online_snapshot(registry: &ConnectionRegistry, tx: &ConnectionSender) {
    let user_ids = registry.online_users();
    send_to_handle(tx, &ServerEvent::GetOnlineUsers { user_ids });
}
