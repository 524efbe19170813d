//! Externally callable administration surface. The CLI and addon commands
//! of the surrounding program delegate here.

use std::sync::Arc;

use tracing::info;

use super::{PlayerListEntry, RelayServer, ServerApiError};
use crate::protocol::{ClientId, DisconnectReason, ServerUpdate};

impl RelayServer {
    /// Disconnect one player with a reason frame. Unlike the transport
    /// event handlers this is an external call, so an unknown id is an
    /// argument error rather than a benign race.
    pub async fn disconnect_player(
        &self,
        client_id: ClientId,
        reason: DisconnectReason,
    ) -> Result<(), ServerApiError> {
        if !self.sessions.contains(client_id) {
            return Err(ServerApiError::UnknownClient(client_id));
        }

        info!(%client_id, %reason, "Disconnecting player");
        self.send_to(client_id, ServerUpdate::Disconnect { reason })
            .await;
        self.disconnect_internal(client_id, false).await;
        self.transport.close_client(client_id).await;
        Ok(())
    }

    pub async fn kick_player(&self, client_id: ClientId) -> Result<(), ServerApiError> {
        self.disconnect_player(client_id, DisconnectReason::Kicked)
            .await
    }

    /// Ban the player's address and auth key, then disconnect it.
    pub async fn ban_player(&self, client_id: ClientId) -> Result<(), ServerApiError> {
        let (remote_addr, auth_key) = self
            .sessions
            .with_record(client_id, |record| {
                (record.remote_addr.clone(), record.auth_key.clone())
            })
            .ok_or(ServerApiError::UnknownClient(client_id))?;

        self.access.ban_address(&remote_addr);
        self.access.ban_key(&auth_key);
        self.disconnect_player(client_id, DisconnectReason::Banned)
            .await
    }

    pub fn ban_address(&self, remote_addr: &str) {
        self.access.ban_address(remote_addr);
    }

    pub fn unban_address(&self, remote_addr: &str) {
        self.access.unban_address(remote_addr);
    }

    pub fn authorize_key(&self, auth_key: &str) {
        self.access.authorize_key(auth_key);
    }

    pub fn deauthorize_key(&self, auth_key: &str) {
        self.access.deauthorize_key(auth_key);
    }

    pub fn set_whitelist_enabled(&self, enabled: bool) {
        self.access.set_whitelist_enabled(enabled);
    }

    pub fn whitelist_key(&self, auth_key: &str) {
        self.access.add_whitelisted(auth_key);
    }

    pub fn prelist_username(&self, username: &str) {
        self.access.add_prelisted(username);
    }

    /// Snapshot of every active player for the admin surface.
    pub fn list_players(&self) -> Vec<PlayerListEntry> {
        self.sessions
            .snapshot()
            .into_iter()
            .filter(|record| record.is_active())
            .map(|record| PlayerListEntry {
                id: record.id,
                username: record.username,
                scene: record.current_scene,
            })
            .collect()
    }

    /// Push a shutdown notice to every client, then drop all state. The
    /// transport stops accepting afterwards; in-flight handlers observing
    /// missing records treat that as a benign race.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        info!(players = self.sessions.len(), "Server shutting down");

        let update = Arc::new(ServerUpdate::Disconnect {
            reason: DisconnectReason::Shutdown,
        });
        for outbox in self.transport.outboxes() {
            outbox.send(update.clone()).await;
        }

        self.sessions.clear();
        self.entities.clear();
        self.transport.stop().await
    }
}
