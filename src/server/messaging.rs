//! Egress helpers. Every broadcast is mediated by scene membership (or the
//! active-record set for global fan-outs); records that have not completed
//! their hello are never addressed.

use std::sync::Arc;

use tracing::debug;

use super::RelayServer;
use crate::protocol::{ClientId, ServerUpdate};

impl RelayServer {
    /// Enqueue one update for one client. A missing outbox is a benign
    /// race with disconnect.
    pub(crate) async fn send_to(&self, client_id: ClientId, update: ServerUpdate) {
        self.send_arc_to(client_id, Arc::new(update)).await;
    }

    pub(crate) async fn send_arc_to(&self, client_id: ClientId, update: Arc<ServerUpdate>) {
        match self.transport.outbox_for(client_id) {
            Some(outbox) => outbox.send(update).await,
            None => {
                debug!(%client_id, "No outbox for client, dropping update");
            }
        }
    }

    /// Fan out to every active record in `scene` except the sender.
    pub(crate) async fn broadcast_in_scene(
        &self,
        scene: &str,
        except: ClientId,
        update: ServerUpdate,
    ) {
        let recipients = self.sessions.peers_in_scene(scene, except);
        self.fan_out(&recipients, update).await;
    }

    /// Fan out to every active record except the sender, regardless of
    /// scene.
    pub(crate) async fn broadcast_active(&self, except: ClientId, update: ServerUpdate) {
        let recipients = self.sessions.active_peers(except);
        self.fan_out(&recipients, update).await;
    }

    /// Fan out to every active record, sender included.
    pub(crate) async fn broadcast_all(&self, update: ServerUpdate) {
        let recipients = self.sessions.active_ids();
        self.fan_out(&recipients, update).await;
    }

    async fn fan_out(&self, recipients: &[ClientId], update: ServerUpdate) {
        let update = Arc::new(update);
        for &client_id in recipients {
            self.send_arc_to(client_id, update.clone()).await;
        }
    }
}
