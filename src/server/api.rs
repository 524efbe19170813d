//! Narrow server view handed to the addon/command system, so addons hold
//! an interface instead of the server itself.

use std::sync::Arc;

use crate::config::ServerSettings;
use crate::events::{
    EventEmitter, PlayerChatEvent, PlayerConnectEvent, PlayerDisconnectEvent,
};
use crate::protocol::{ClientId, DisconnectReason};

use super::{PlayerListEntry, RelayServer, ServerApiError};

/// Cloneable handle exposing the administrative and event-subscription
/// surface of a [`RelayServer`].
#[derive(Clone)]
pub struct ServerApi {
    server: Arc<RelayServer>,
}

impl RelayServer {
    pub fn api(self: &Arc<Self>) -> ServerApi {
        ServerApi {
            server: self.clone(),
        }
    }
}

impl ServerApi {
    pub async fn broadcast_chat_message(&self, message: &str) -> Result<(), ServerApiError> {
        self.server.broadcast_chat_message(message).await
    }

    pub async fn send_chat_to(
        &self,
        client_id: ClientId,
        message: &str,
    ) -> Result<(), ServerApiError> {
        self.server.send_chat_to(client_id, message).await
    }

    pub async fn disconnect_player(
        &self,
        client_id: ClientId,
        reason: DisconnectReason,
    ) -> Result<(), ServerApiError> {
        self.server.disconnect_player(client_id, reason).await
    }

    pub async fn kick_player(&self, client_id: ClientId) -> Result<(), ServerApiError> {
        self.server.kick_player(client_id).await
    }

    pub async fn ban_player(&self, client_id: ClientId) -> Result<(), ServerApiError> {
        self.server.ban_player(client_id).await
    }

    pub fn authorize_key(&self, auth_key: &str) {
        self.server.authorize_key(auth_key);
    }

    pub fn list_players(&self) -> Vec<PlayerListEntry> {
        self.server.list_players()
    }

    pub async fn current_settings(&self) -> ServerSettings {
        self.server.current_settings().await
    }

    pub async fn apply_server_settings(&self, settings: ServerSettings) {
        self.server.apply_server_settings(settings).await;
    }

    pub fn chat_events(&self) -> &EventEmitter<PlayerChatEvent> {
        &self.server.chat_events
    }

    pub fn connect_events(&self) -> &EventEmitter<PlayerConnectEvent> {
        &self.server.connect_events
    }

    pub fn disconnect_events(&self) -> &EventEmitter<PlayerDisconnectEvent> {
        &self.server.disconnect_events
    }
}
