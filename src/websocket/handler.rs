//! WebSocket Handler
//!
//! One persistent duplex channel per client. Each connection runs two
//! cooperative activities: a read loop for inbound messages and a write task
//! draining the hub's bounded outbound buffer. A read failure or close tears
//! both down and unregisters the connection.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::websocket::hub::ServerEvent;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate the push channel with a clearinghouse token.
    YellowAuth {
        jwt_token: String,
        #[allow(dead_code)]
        session_key: String,
    },
}

pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (connection_id, mut outbound) = state.hub.register();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    state
        .hub
        .send_to(connection_id, &ServerEvent::Connected { connection_id });

    // Write side: drain the hub's buffer into the socket.
    let mut write_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if ws_sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    // Read side: inbound client messages until close or failure.
    let read_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_client_message(&text, connection_id, &read_state);
                }
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    // Connection reset without a closing handshake is normal.
                    tracing::debug!(connection_id = %connection_id, error = %e, "websocket read failed");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut write_task => {}
        _ = &mut read_task => {}
    }
    write_task.abort();
    read_task.abort();

    state.hub.unregister(connection_id);
    tracing::debug!(connection_id = %connection_id, "websocket connection closed");
}

fn handle_client_message(text: &str, connection_id: Uuid, state: &Arc<AppState>) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(_) => {
            state.hub.send_to(
                connection_id,
                &ServerEvent::Error {
                    message: "unrecognized message".to_string(),
                },
            );
            return;
        }
    };

    match message {
        ClientMessage::YellowAuth { jwt_token, .. } => {
            match state.token_validator.validate(&jwt_token) {
                Ok(principal) => {
                    tracing::info!(
                        connection_id = %connection_id,
                        user_id = %principal.user_id,
                        "push channel authenticated"
                    );
                    state.hub.send_to(
                        connection_id,
                        &ServerEvent::YellowAuthSuccess {
                            user_id: principal.user_id.clone(),
                            expires_at: principal.expires_at,
                        },
                    );
                    state.hub.set_principal(connection_id, principal);
                }
                Err(e) => {
                    state.hub.send_to(
                        connection_id,
                        &ServerEvent::Error {
                            message: format!("authentication failed: {e}"),
                        },
                    );
                }
            }
        }
    }
}
