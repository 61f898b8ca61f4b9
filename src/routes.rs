use axum::Router;

use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Build the axum Router with all routes.
/// The relay is driven entirely over the WebSocket endpoint; everything the
/// application persists (history, uploads, auth) lives behind other services.
pub fn build_router(state: AppState) -> Router {
    // WebSocket endpoint (identity via query param, supplied by the session layer)
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new().merge(ws_routes).merge(health).with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
