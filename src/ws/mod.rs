pub mod actor;
pub mod broadcast;
pub mod handler;
pub mod protocol;

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Connection registry: maps a user identity to its single live connection.
/// At most one entry per identity at any instant; a later connection under
/// the same identity replaces the earlier one (last connection wins).
///
/// Connections that never identified are tracked in a side table: they take
/// no part in the online set but still receive broadcasts.
///
/// All mutation goes through this struct so the online set stays consistent
/// with the registered connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: DashMap<String, ConnectionSender>,
    unidentified: DashMap<u64, ConnectionSender>,
    next_guest_id: AtomicU64,
    broadcast_lock: Mutex<()>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `user_id`. Always succeeds.
    /// Returns the superseded sender when an earlier connection held the
    /// identity, so the caller can close it.
    pub fn register(&self, user_id: &str, tx: ConnectionSender) -> Option<ConnectionSender> {
        self.entries.insert(user_id.to_string(), tx)
    }

    /// Remove the entry for `user_id`, but only if it still belongs to `tx`'s
    /// channel. A connection that has been superseded by a newer one must not
    /// evict its replacement during its own cleanup.
    /// Returns whether an entry was removed; absent entries are a no-op.
    pub fn unregister(&self, user_id: &str, tx: &ConnectionSender) -> bool {
        self.entries
            .remove_if(user_id, |_, stored| stored.same_channel(tx))
            .is_some()
    }

    /// Look up the live connection for `user_id`, if any.
    pub fn lookup(&self, user_id: &str) -> Option<ConnectionSender> {
        self.entries.get(user_id).map(|entry| entry.value().clone())
    }

    /// Current set of online identities.
    pub fn online_users(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// All registered (identity, sender) pairs, for fan-out.
    pub fn connections(&self) -> Vec<(String, ConnectionSender)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Track a connection that has no identity. Returns a guest id for later
    /// detach. The connection is invisible to `online_users` and `lookup`.
    pub fn attach_unidentified(&self, tx: ConnectionSender) -> u64 {
        let guest_id = self.next_guest_id.fetch_add(1, Ordering::Relaxed);
        self.unidentified.insert(guest_id, tx);
        guest_id
    }

    /// Remove an unidentified connection. No-op if already gone.
    pub fn detach_unidentified(&self, guest_id: u64) {
        self.unidentified.remove(&guest_id);
    }

    /// All unidentified (guest id, sender) pairs, for fan-out.
    pub fn unidentified_connections(&self) -> Vec<(u64, ConnectionSender)> {
        self.unidentified
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Serializes snapshot-plus-fan-out sequences. Whoever holds the guard
    /// enqueues its broadcast before any later snapshot is taken, so every
    /// connection receives presence sets in snapshot order and the last
    /// frame on a queue always carries the freshest set. Sends are
    /// non-blocking queue pushes, so the guard is never held across I/O.
    pub fn broadcast_guard(&self) -> MutexGuard<'_, ()> {
        self.broadcast_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
