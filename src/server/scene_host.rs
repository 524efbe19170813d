//! Scene host election. At most one record per non-empty scene holds the
//! host flag; its simulation is authoritative for that scene's entities.

use tracing::info;

use super::RelayServer;
use crate::protocol::ClientId;

impl RelayServer {
    /// Pick the departing host's successor: the first other record still
    /// in the scene by session-table iteration order. Sets the successor's
    /// flag and returns its id; returns `None` when the scene has no other
    /// occupant.
    ///
    /// Callers hold the scene lock, so the window between clearing the
    /// leaver's flag and setting the successor's is not observable through
    /// [`RelayServer::scene_host_of`].
    pub(crate) fn elect_successor(&self, scene: &str, leaving: ClientId) -> Option<ClientId> {
        let successor = self.sessions.first_peer_in_scene(scene, leaving)?;
        self.sessions
            .with_record_mut(successor, |record| record.is_scene_host = true);
        info!(scene = %scene, from = %leaving, to = %successor, "Scene host transferred");
        Some(successor)
    }

    /// The current scene host, observed atomically with respect to
    /// transitions in that scene.
    pub async fn scene_host_of(&self, scene: &str) -> Option<ClientId> {
        let _guard = self.lock_scene(scene).await;
        self.sessions
            .snapshot()
            .into_iter()
            .find(|record| record.in_scene(scene) && record.is_scene_host)
            .map(|record| record.id)
    }
}
