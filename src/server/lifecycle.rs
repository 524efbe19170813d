//! Player lifecycle: hello, scene transitions, disconnect and timeout.
//!
//! Scene transitions run under the per-scene locks so host election and
//! the entity-cache purge stay atomic with respect to membership changes.

use tracing::{debug, info, warn};

use super::session::Lifecycle;
use super::RelayServer;
use crate::events::{PlayerConnectEvent, PlayerDisconnectEvent};
use crate::protocol::{
    AlreadyInScenePayload, ClientId, EnterScenePayload, HelloServerPayload, ServerUpdate, Vec2,
};

/// Pose carried by an enter-scene message; hello applies the pose before
/// falling through, so it passes `None`.
pub(crate) type EnterPose = Option<(Vec2, bool, u16)>;

impl RelayServer {
    /// First message after login: makes the player visible to everyone and
    /// falls through to entering the scene its save file names.
    pub(crate) async fn handle_hello(&self, client_id: ClientId, payload: HelloServerPayload) {
        let username = match self.sessions.with_record_mut(client_id, |record| {
            if record.lifecycle != Lifecycle::Reserved {
                return None;
            }
            record.position = payload.position;
            record.scale = payload.scale;
            record.animation_clip = payload.animation_clip;
            record.lifecycle = Lifecycle::Greeted;
            Some(record.username.clone())
        }) {
            None => {
                warn!(%client_id, "Hello from a client with no player record");
                return;
            }
            Some(None) => {
                warn!(%client_id, "Hello from a client that already completed its handshake");
                return;
            }
            Some(Some(username)) => username,
        };

        info!(%client_id, %username, scene = %payload.scene, "Player hello");

        self.broadcast_active(
            client_id,
            ServerUpdate::PlayerConnect {
                client_id,
                username: username.clone(),
            },
        )
        .await;

        let peers = self.sessions.connected_peers(client_id);
        self.send_to(client_id, ServerUpdate::HelloClient { peers })
            .await;

        let (team, position) = self
            .sessions
            .with_record(client_id, |record| (record.team, record.position))
            .unwrap_or_default();
        let mut event = PlayerConnectEvent {
            client_id,
            username,
            team,
            position,
        };
        self.connect_events.emit(&mut event);

        self.enter_scene(client_id, &payload.scene, None).await;
    }

    pub(crate) async fn handle_enter_scene(&self, client_id: ClientId, payload: EnterScenePayload) {
        let active = self
            .sessions
            .with_record(client_id, |record| record.is_active());
        if active != Some(true) {
            warn!(%client_id, "Enter-scene from a client that has not completed its hello");
            return;
        }
        self.enter_scene(
            client_id,
            &payload.scene,
            Some((payload.position, payload.scale, payload.animation_clip)),
        )
        .await;
    }

    /// Explicit leave without a destination scene.
    pub(crate) async fn handle_leave_scene(&self, client_id: ClientId) {
        let scene = match self
            .sessions
            .with_record(client_id, |record| record.current_scene.clone())
        {
            None => {
                warn!(%client_id, "Leave-scene from a client with no player record");
                return;
            }
            Some(scene) if scene.is_empty() => {
                debug!(%client_id, "Leave-scene from a client not in any scene");
                return;
            }
            Some(scene) => scene,
        };

        let _guard = self.lock_scene(&scene).await;
        self.depart_scene(client_id, &scene, true).await;
        self.sessions
            .with_record_mut(client_id, |record| record.lifecycle = Lifecycle::Greeted);
    }

    /// Shared enter-scene flow: leaves the previous scene if any, makes
    /// the player a member of the new one, notifies peers and bootstraps
    /// the entering player with the already-in-scene peers plus the cached
    /// entity state.
    pub(crate) async fn enter_scene(&self, client_id: ClientId, new_scene: &str, pose: EnterPose) {
        if new_scene.is_empty() {
            warn!(%client_id, "Enter-scene with an empty scene name");
            return;
        }

        let old_scene = match self
            .sessions
            .with_record(client_id, |record| record.current_scene.clone())
        {
            None => {
                warn!(%client_id, "Enter-scene for a client with no player record");
                return;
            }
            Some(scene) => scene,
        };

        let _guards = if old_scene.is_empty() || old_scene == new_scene {
            (self.lock_scene(new_scene).await, None)
        } else {
            let (a, b) = self.lock_scene_pair(&old_scene, new_scene).await;
            (a, b)
        };

        if !old_scene.is_empty() && old_scene != new_scene {
            self.depart_scene(client_id, &old_scene, true).await;
        }

        let entering = match self.sessions.with_record_mut(client_id, |record| {
            if let Some((position, scale, animation_clip)) = pose {
                record.position = position;
                record.scale = scale;
                record.animation_clip = animation_clip;
            }
            record.lifecycle = Lifecycle::InScene;
            record.current_scene = new_scene.to_string();
            record.scene_peer()
        }) {
            None => {
                debug!(%client_id, "Player record vanished during scene entry");
                return;
            }
            Some(entering) => entering,
        };

        let peers = self.sessions.scene_peers(new_scene, client_id);
        for peer in &peers {
            self.send_to(
                peer.client_id,
                ServerUpdate::PlayerEnterScene(entering.clone()),
            )
            .await;
        }

        let mut entity_spawns = Vec::new();
        let mut entity_updates = Vec::new();
        for (key, state) in self.entities.snapshot_scene(new_scene) {
            if let Some(spawn) = state.spawn_payload(key.entity_id) {
                entity_spawns.push(spawn);
            }
            entity_updates.push(state.replay_payload(key.entity_id));
        }

        let scene_host = if peers.is_empty() {
            self.sessions
                .with_record_mut(client_id, |record| record.is_scene_host = true);
            true
        } else {
            self.sessions
                .with_record(client_id, |record| record.is_scene_host)
                .unwrap_or(false)
        };

        info!(
            %client_id,
            scene = %new_scene,
            peer_count = peers.len(),
            %scene_host,
            "Player entered scene"
        );

        self.send_to(
            client_id,
            ServerUpdate::PlayerAlreadyInScene(Box::new(AlreadyInScenePayload {
                peers,
                entity_spawns,
                entity_updates,
                scene_host,
            })),
        )
        .await;
    }

    /// Remove a player from a scene. Caller holds the scene lock.
    ///
    /// Clears scene membership before anything else so an in-flight entity
    /// update from the departing host can no longer re-populate the cache
    /// once the purge runs. `notify_peers` is false on disconnect, where
    /// the global PlayerDisconnect broadcast already covers the scene.
    pub(crate) async fn depart_scene(&self, client_id: ClientId, scene: &str, notify_peers: bool) {
        let was_host = self
            .sessions
            .with_record_mut(client_id, |record| {
                let was_host = record.is_scene_host;
                record.is_scene_host = false;
                record.current_scene.clear();
                was_host
            })
            .unwrap_or(false);

        let peers = self.sessions.peers_in_scene(scene, client_id);

        if notify_peers {
            for &peer in &peers {
                self.send_to(peer, ServerUpdate::PlayerLeaveScene { client_id })
                    .await;
            }
        }

        if was_host {
            if let Some(successor) = self.elect_successor(scene, client_id) {
                self.send_to(successor, ServerUpdate::SceneHostTransfer).await;
            }
        }

        if peers.is_empty() {
            debug!(scene = %scene, "Scene empty, purging entity cache");
            self.entities.purge_scene(scene);
        }
    }

    /// Transport-initiated disconnect: the connection is already gone.
    pub async fn handle_client_disconnect(&self, client_id: ClientId) {
        self.disconnect_internal(client_id, false).await;
    }

    /// Transport-detected timeout; identical to disconnect except for the
    /// flag on the fan-out frame (and the transport has already closed the
    /// connection).
    pub async fn handle_client_timeout(&self, client_id: ClientId) {
        self.disconnect_internal(client_id, true).await;
    }

    pub(crate) async fn disconnect_internal(&self, client_id: ClientId, timed_out: bool) {
        // Claim the record; a second disconnect for the same id is a no-op.
        let claim = self.sessions.with_record_mut(client_id, |record| {
            if record.lifecycle == Lifecycle::Departed {
                return None;
            }
            let info = (
                record.username.clone(),
                record.current_scene.clone(),
                record.is_active(),
            );
            record.lifecycle = Lifecycle::Departed;
            Some(info)
        });

        let (username, scene, was_active) = match claim {
            None | Some(None) => {
                debug!(%client_id, "Disconnect for an unknown or already departed client");
                return;
            }
            Some(Some(info)) => info,
        };

        info!(%client_id, %username, %timed_out, "Player disconnecting");

        if !scene.is_empty() {
            let _guard = self.lock_scene(&scene).await;
            self.depart_scene(client_id, &scene, false).await;
        }

        if was_active {
            self.broadcast_active(
                client_id,
                ServerUpdate::PlayerDisconnect {
                    client_id,
                    username: username.clone(),
                    timed_out,
                },
            )
            .await;
        }

        self.sessions.remove(client_id);

        if was_active {
            let mut event = PlayerDisconnectEvent {
                client_id,
                username,
                timed_out,
            };
            self.disconnect_events.emit(&mut event);
        }
    }
}
