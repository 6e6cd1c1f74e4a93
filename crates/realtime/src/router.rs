//! Inbound chat event routing.
//!
//! A chat event is either broadcast to the sender's room mates or, when it
//! carries the mention token, detoured through the AI responder and then
//! broadcast to the whole room including the sender.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use huddle_ai::{AiResponder, FALLBACK_REPLY};

use crate::events::{Peer, RoomEvent, ServerEvent};
use crate::gate::{AdmittedConnection, ConnectionPhase};
use crate::registry::RoomRegistry;

/// Any occurrence of this substring routes the whole message to the AI
/// responder.
pub const MENTION_TOKEN: &str = "@ai";

#[derive(Debug, Error)]
pub enum RouteError {
    /// The event declared a room other than the connection's admitted room.
    /// Terminates only the offending event, never the connection.
    #[error("event declares room {declared} but connection is admitted to {admitted}")]
    RoomMismatch { declared: String, admitted: String },
}

/// An inbound chat event during routing. Transient; never stored.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub room_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Human,
    AiDirected,
}

/// Substring match, not whole-word: any occurrence anywhere in the text
/// triggers AI routing for the entire message.
pub fn classify(text: &str) -> Classification {
    if text.contains(MENTION_TOKEN) {
        Classification::AiDirected
    } else {
        Classification::Human
    }
}

pub struct MessageRouter {
    registry: Arc<RoomRegistry>,
    responder: Arc<dyn AiResponder>,
}

impl MessageRouter {
    pub fn new(registry: Arc<RoomRegistry>, responder: Arc<dyn AiResponder>) -> Self {
        Self {
            registry,
            responder,
        }
    }

    /// Route one chat event from an admitted connection.
    ///
    /// Human messages fan out to every current member except the sender.
    /// AI-directed messages suspend on the responder with no registry lock
    /// held; the room keeps processing other traffic meanwhile, and the
    /// reply (or the fallback text) goes to every member including the
    /// sender, attributed to the AI participant.
    pub async fn route(
        &self,
        connection: &AdmittedConnection,
        event: ChatEvent,
    ) -> Result<(), RouteError> {
        if event.room_id != connection.room_id() {
            return Err(RouteError::RoomMismatch {
                declared: event.room_id,
                admitted: connection.room_id().to_string(),
            });
        }

        if connection.phase() == ConnectionPhase::Closed {
            debug!(room = %event.room_id, "dropping event from closed connection");
            return Ok(());
        }

        match classify(&event.text) {
            Classification::Human => {
                self.registry
                    .publish(
                        &event.room_id,
                        RoomEvent::excluding(
                            ServerEvent::ChatMessage {
                                message: event.text,
                                sender: Peer::from(connection.identity()),
                            },
                            connection.id(),
                        ),
                    )
                    .await;
            }
            Classification::AiDirected => {
                let prompt = event.text.replacen(MENTION_TOKEN, "", 1);

                let reply = match self.responder.generate(&prompt).await {
                    Ok(text) => text,
                    Err(error) => {
                        warn!(%error, "ai responder failed, delivering fallback");
                        FALLBACK_REPLY.to_string()
                    }
                };

                let delivered = self
                    .registry
                    .publish(
                        &event.room_id,
                        RoomEvent::to_all(ServerEvent::ChatMessage {
                            message: reply,
                            sender: Peer::ai(),
                        }),
                    )
                    .await;
                if delivered == 0 {
                    debug!(room = %event.room_id, "room emptied before ai reply arrived");
                }
            }
        }

        Ok(())
    }
}
