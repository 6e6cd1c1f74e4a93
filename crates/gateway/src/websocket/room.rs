//! Room WebSocket handler: runs the admission handshake, then pumps events
//! between the socket and the room's broadcast channel.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use huddle_realtime::{
    AdmittedConnection, ChatEvent, ClientEvent, HandshakeRequest, RoomEvent,
};

use crate::error::GatewayError;
use crate::middleware::bearer_token;
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct RoomSocketQuery {
    pub project_id: Option<String>,
    /// Fallback credential for clients that cannot set headers.
    pub token: Option<String>,
}

/// Handshake and upgrade. A rejected handshake surfaces its reason as an
/// HTTP error before any room mutation; an admitted connection is bound to
/// its room for the socket's lifetime.
pub async fn room_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Query(query): Query<RoomSocketQuery>,
) -> Result<Response, GatewayError> {
    let credential = bearer_token(&headers).or(query.token);

    let (connection, receiver) = state
        .gate
        .admit(HandshakeRequest {
            credential,
            room_id: query.project_id,
        })
        .await?;

    Ok(ws.on_upgrade(move |socket| handle_room_socket(socket, state, connection, receiver)))
}

async fn handle_room_socket(
    socket: WebSocket,
    state: Arc<GatewayState>,
    connection: AdmittedConnection,
    events: broadcast::Receiver<RoomEvent>,
) {
    let connection = Arc::new(connection);
    let (mut sink, mut stream) = socket.split();
    let connection_id = connection.id();

    // Outbound: room broadcast -> socket. Fire-and-forget per recipient; a
    // lagging connection loses events rather than blocking the room.
    let mut send_task = tokio::spawn(async move {
        let mut events = events;
        loop {
            match events.recv().await {
                Ok(event) => {
                    if !event.visible_to(connection_id) {
                        continue;
                    }
                    match serde_json::to_string(&event.event) {
                        Ok(text) => {
                            if sink.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Err(error) => warn!(%error, "failed to encode server event"),
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "connection lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Inbound: socket -> message router.
    let router = state.router.clone();
    let inbound_connection = connection.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    let event = match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => event,
                        Err(error) => {
                            debug!(%error, "ignoring malformed client event");
                            continue;
                        }
                    };
                    let ClientEvent::ChatMessage { message } = event;
                    let chat = ChatEvent {
                        room_id: inbound_connection.room_id().to_string(),
                        text: message,
                    };
                    if let Err(error) = router.route(&inbound_connection, chat).await {
                        warn!(%error, "dropped chat event");
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.gate.close(&connection).await;
}
