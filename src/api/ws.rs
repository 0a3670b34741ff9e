//! WebSocket endpoint for the live dashboard.
//!
//! A client receives one `snapshot` message on connect, then a `reading`
//! message per processed reading and a `reset` message whenever the
//! dashboard state is cleared.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use super::handlers::ApiState;
use crate::pipeline::LiveUpdate;

/// GET /ws/frontend
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ApiState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    // Subscribe before taking the snapshot so no update falls in between
    let mut rx = state.live_tx.subscribe();
    let snapshot = state.app_state.read().await.live_snapshot();

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        if !send_update(&mut sink, &snapshot).await {
            return;
        }
        loop {
            let update = match rx.recv().await {
                Ok(update) => update,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(conn_id = %sender_conn_id, skipped, "WebSocket client lagging, skipped updates");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if !send_update(&mut sink, &update).await {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Inbound messages carry nothing; only watch for close
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Returns `false` once the sink is closed.
async fn send_update<S>(sink: &mut S, update: &LiveUpdate) -> bool
where
    S: futures::Sink<Message> + Unpin,
{
    let text = match serde_json::to_string(update) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize live update");
            return true;
        }
    };
    sink.send(Message::Text(text)).await.is_ok()
}
