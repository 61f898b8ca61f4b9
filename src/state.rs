use std::sync::Arc;

use crate::ws::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Live connections, one per online user.
    /// Single source of truth for who is online.
    pub connections: Arc<ConnectionRegistry>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(ConnectionRegistry::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
