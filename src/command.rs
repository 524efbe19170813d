//! Chat command dispatch capability.
//!
//! Command parsing and the commands themselves live with the embedding
//! program; the core only offers each chat line for dispatch before
//! treating it as player chat.

use async_trait::async_trait;

use crate::protocol::ClientId;
use crate::transport::ClientOutbox;

/// Descriptor of the player issuing a potential command.
pub struct CommandSender {
    pub client_id: ClientId,
    pub username: String,
    /// Whether the player's auth key is on the authorized-key list.
    pub is_authorized: bool,
    outbox: Option<ClientOutbox>,
}

impl CommandSender {
    pub fn new(
        client_id: ClientId,
        username: String,
        is_authorized: bool,
        outbox: Option<ClientOutbox>,
    ) -> Self {
        Self {
            client_id,
            username,
            is_authorized,
            outbox,
        }
    }

    /// Reply to the sender. Multi-line replies become one chat frame per
    /// line.
    pub async fn reply(&self, text: &str) {
        if let Some(outbox) = &self.outbox {
            outbox.send_chat(text).await;
        }
    }
}

/// Capability that routes chat text to registered commands. Returns true
/// when the message was consumed as a command.
#[async_trait]
pub trait CommandBus: Send + Sync {
    async fn dispatch(&self, sender: &CommandSender, message: &str) -> bool;
}

/// Command bus that never consumes messages; everything falls through to
/// chat.
#[derive(Default)]
pub struct NullCommandBus;

#[async_trait]
impl CommandBus for NullCommandBus {
    async fn dispatch(&self, _sender: &CommandSender, _message: &str) -> bool {
        false
    }
}
