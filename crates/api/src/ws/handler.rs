use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;

use crate::auth::jwt::{validate_token, Claims};
use crate::notifications::{envelope, EVENT_AUTH_ERROR, EVENT_CONNECTED};
use crate::state::AppState;
use crate::ws::manager::WsManager;

/// Query parameters for the WebSocket upgrade (`GET /ws?token=...`).
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// Authentication happens once per connection, here: the bearer token
/// arrives as a query parameter because browsers cannot set headers on
/// WebSocket upgrades. An invalid or missing token still completes the
/// upgrade so the client can be told *why* with an `authError` frame
/// before the socket is closed.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsAuthQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let claims = params
        .token
        .as_deref()
        .and_then(|token| validate_token(token, &state.config.jwt).ok());
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager, claims))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Rejects unauthenticated sockets with `authError` + Close.
///   2. Registers the connection with `WsManager` and confirms with a
///      `connected` event.
///   3. Spawns a sender task that forwards messages from the manager channel.
///   4. Processes inbound messages on the current task.
///   5. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>, claims: Option<Claims>) {
    let (mut sink, mut stream) = socket.split();

    let Some(claims) = claims else {
        tracing::debug!("WebSocket upgrade without valid token");
        let _ = sink
            .send(envelope(
                EVENT_AUTH_ERROR,
                json!({ "error": "Invalid or missing token" }),
            ))
            .await;
        let _ = sink.send(Message::Close(None)).await;
        return;
    };

    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id = claims.sub, role = %claims.role, "WebSocket connected");

    // Register and get the receiver for outbound messages.
    let mut rx = ws_manager.add(conn_id.clone(), claims.sub, claims.role).await;

    // Confirm the authenticated connection to the client.
    let _ = sink
        .send(envelope(
            EVENT_CONNECTED,
            json!({ "user_id": claims.sub, "role": claims.role }),
        ))
        .await;

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: the protocol is server-push; inbound traffic is only
    // connection housekeeping.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_msg) => {
                tracing::trace!(conn_id = %conn_id, "Ignoring inbound message");
            }
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove connection and abort sender task.
    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
