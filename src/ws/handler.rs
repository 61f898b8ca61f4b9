use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    response::Response,
};
use serde::Deserialize;

use crate::state::AppState;
use crate::ws::actor;

/// Query parameters for the WebSocket upgrade. The identity arrives as
/// `?user_id=...`, issued by the externally-managed auth session; the relay
/// trusts it verbatim and performs no validation beyond presence.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub user_id: Option<String>,
}

/// GET /ws?user_id=<identity>
/// WebSocket upgrade endpoint. Spawns an actor for the connection.
/// A connection without an identity is accepted and stays open, but is never
/// registered and cannot emit addressed events.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    match &params.user_id {
        Some(user_id) => {
            tracing::info!(user_id = %user_id, "WebSocket connection identified");
        }
        None => {
            tracing::info!("WebSocket connection without identity");
        }
    }

    ws.on_upgrade(move |socket| actor::run_connection(socket, state, params.user_id))
}
