//! WebSocket Transport
//!
//! One task per connection reads requests off the socket and feeds them to
//! the command processor; a second task drains the connection's outbound
//! queue into the socket. The queue carries both command responses and
//! subscription notifications, so a client observes them in one ordered
//! stream.
//!
//! Disconnect, however it happens, tears the connection down the same way:
//! the registry entry is removed and every subscription owned by the
//! connection is cleared.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::auth::Channel;
use crate::server::state::AppState;

/// Upgrade handler for the signal endpoint
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let conn_id = state.registry.register(outbound_tx.clone());
    let mut channel = Channel::new(conn_id);
    tracing::info!("[Server] connection {} opened", conn_id);

    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sink.send(Message::Text(message)).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let response = state.processor.process(&mut channel, &text).await;
                if outbound_tx.send(response).is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("[Server] connection {} read error: {}", conn_id, e);
                break;
            }
        }
    }

    state.registry.unregister(conn_id);
    state.engine.unsubscribe_all(conn_id);
    drop(outbound_tx);
    let _ = writer.await;
    tracing::info!("[Server] connection {} closed", conn_id);
}
