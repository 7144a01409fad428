use axum::{routing::get, Router};

use crate::app_state::AppState;

use super::ws_handler::ws_handler;

pub fn websocket_routes() -> Router<AppState> {
    Router::new().route("/events/ws", get(ws_handler))
}
