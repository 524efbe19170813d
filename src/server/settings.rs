//! Server settings replication.

use std::sync::Arc;

use tracing::info;

use super::RelayServer;
use crate::config::ServerSettings;
use crate::protocol::ServerUpdate;

impl RelayServer {
    pub async fn current_settings(&self) -> ServerSettings {
        self.settings.read().await.clone()
    }

    /// Replace the gameplay settings and push them to every connected
    /// client. Applying a value equal to the current settings sends
    /// nothing.
    pub async fn apply_server_settings(&self, new_settings: ServerSettings) {
        {
            let mut current = self.settings.write().await;
            if *current == new_settings {
                return;
            }
            *current = new_settings.clone();
        }

        info!("Server settings changed, pushing to all clients");
        let update = Arc::new(ServerUpdate::ServerSettings(new_settings));
        for outbox in self.transport.outboxes() {
            outbox.send(update.clone()).await;
        }
    }
}
