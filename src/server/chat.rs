//! Chat routing: command dispatch, then the cancelable chat event, then
//! the global broadcast.

use tracing::{debug, warn};

use super::{RelayServer, ServerApiError};
use crate::command::CommandSender;
use crate::events::PlayerChatEvent;
use crate::protocol::{ClientId, ServerUpdate};

impl RelayServer {
    pub(crate) async fn handle_chat(&self, client_id: ClientId, message: String) {
        let context = self.sessions.with_record(client_id, |record| {
            record
                .is_active()
                .then(|| (record.username.clone(), record.auth_key.clone()))
        });
        let (username, auth_key) = match context {
            None | Some(None) => {
                warn!(%client_id, "Chat from an unknown or reserved client, dropping");
                return;
            }
            Some(Some(context)) => context,
        };

        let sender = CommandSender::new(
            client_id,
            username.clone(),
            self.access.is_authorized(&auth_key),
            self.transport.outbox_for(client_id),
        );
        if self.command_bus.dispatch(&sender, &message).await {
            debug!(%client_id, "Chat consumed as a command");
            return;
        }

        let mut event = PlayerChatEvent::new(client_id, username.clone(), message.clone());
        self.chat_events.emit(&mut event);
        if event.is_cancelled() {
            debug!(%client_id, "Chat cancelled by an event subscriber");
            return;
        }

        self.broadcast_all(ServerUpdate::ChatMessage {
            message: format!("[{username}]: {message}"),
        })
        .await;
    }

    /// Server-originated chat broadcast to every active player.
    pub async fn broadcast_chat_message(&self, message: &str) -> Result<(), ServerApiError> {
        let max = self.config.max_chat_message_length;
        if message.len() > max {
            return Err(ServerApiError::MessageTooLong {
                length: message.len(),
                max,
            });
        }

        self.broadcast_all(ServerUpdate::ChatMessage {
            message: message.to_string(),
        })
        .await;
        Ok(())
    }

    /// Server-originated chat to one player, split into one frame per
    /// line.
    pub async fn send_chat_to(
        &self,
        client_id: ClientId,
        message: &str,
    ) -> Result<(), ServerApiError> {
        let outbox = self
            .transport
            .outbox_for(client_id)
            .ok_or(ServerApiError::UnknownClient(client_id))?;
        outbox.send_chat(message).await;
        Ok(())
    }
}
