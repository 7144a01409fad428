use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tracing::debug;

use crate::app_state::AppState;
use crate::events::EventSink;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.events.clone()))
}

/// Read-only stream: published envelopes flow out, inbound frames are
/// drained only to notice the close.
async fn handle_socket(socket: WebSocket, events: EventSink) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = events.subscribe();

    let send_task = tokio::spawn(async move {
        while let Ok(envelope) = rx.recv().await {
            if sender.send(Message::Text(envelope.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }
    debug!("event stream subscriber disconnected");
}
