use axum::{
    extract::{
        Extension, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use trellis_model::User;
use uuid::Uuid;

use crate::infra::{
    app_state::AppState,
    websocket::{ClientMessage, Connection, ConnectionManager, ServerMessage},
};

const OUTGOING_BUFFER: usize = 256;

/// Handle WebSocket upgrade request
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, user: User) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTGOING_BUFFER);

    let connection = Arc::new(Connection::new(user.clone(), tx));
    let conn_id = connection.id;
    state.channels.add_connection(connection.clone());

    // Hand the client its connection id first; it echoes the id in
    // X-Connection-Id so its own mutations are not fanned back to it.
    let _ = connection.send(ServerMessage::Connected {
        connection_id: conn_id,
    });

    // Pump queued messages out to the socket
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&msg) else {
                continue;
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(client_msg) => {
                        handle_client_message(
                            client_msg,
                            &state,
                            &connection,
                            &user,
                        );
                    }
                    Err(_) => {
                        let _ = connection.send(ServerMessage::Error {
                            message: "unrecognized message".to_string(),
                        });
                    }
                }
            }
            Ok(Message::Close(_)) => {
                break;
            }
            Err(e) => {
                tracing::debug!(connection_id = %conn_id, error = %e, "websocket error");
                break;
            }
            _ => {}
        }
    }

    state.channels.remove_connection(conn_id);
    tracing::debug!(connection_id = %conn_id, user_id = %user.id, "websocket disconnected");
}

fn handle_client_message(
    message: ClientMessage,
    state: &AppState,
    connection: &Connection,
    user: &User,
) {
    match message {
        ClientMessage::Subscribe { channel } => {
            if !ConnectionManager::may_subscribe(user, channel) {
                let _ = connection.send(ServerMessage::Error {
                    message: format!(
                        "not authorized to subscribe to channel {channel}"
                    ),
                });
                return;
            }
            state.channels.subscribe(channel, connection.id);
            let _ = connection.send(ServerMessage::Subscribed { channel });
        }
        ClientMessage::Unsubscribe { channel } => {
            state.channels.unsubscribe(channel, connection.id);
            let _ = connection.send(ServerMessage::Unsubscribed { channel });
        }
        ClientMessage::Ping => {
            let _ = connection.send(ServerMessage::Pong);
        }
    }
}
