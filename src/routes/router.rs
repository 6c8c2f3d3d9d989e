//! Router Configuration
//!
//! The server exposes a single endpoint: `GET /vss` upgrades to the
//! WebSocket carrying the JSON command dialect.

use axum::routing::get;
use axum::Router;

use crate::server::state::AppState;
use crate::server::ws::ws_handler;

/// Build the router over the shared application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/vss", get(ws_handler))
        .with_state(state)
}
