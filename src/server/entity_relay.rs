//! Entity spawn and update relay: merge into the cache, forward to scene
//! peers.

use tracing::{debug, warn};

use super::entity_cache::EntityKey;
use super::RelayServer;
use crate::protocol::{ClientId, EntitySpawnPayload, EntityUpdatePayload, ServerUpdate};

impl RelayServer {
    /// Spawns originate only from the scene host; anything else is a
    /// protocol violation and leaves the cache untouched.
    pub(crate) async fn handle_entity_spawn(&self, client_id: ClientId, payload: EntitySpawnPayload) {
        let context = self
            .sessions
            .with_record(client_id, |record| {
                (record.current_scene.clone(), record.is_scene_host)
            });
        let (scene, is_host) = match context {
            None => {
                warn!(%client_id, "Entity spawn from a client with no player record");
                return;
            }
            Some(context) => context,
        };
        if scene.is_empty() {
            debug!(%client_id, "Entity spawn outside any scene, dropping");
            return;
        }
        if !is_host {
            warn!(
                %client_id,
                scene = %scene,
                entity_id = payload.entity_id,
                "Entity spawn from non-host, dropping"
            );
            return;
        }

        self.entities
            .with_state_mut(EntityKey::new(scene.clone(), payload.entity_id), |state| {
                state.mark_spawned(payload.spawning_type, payload.spawned_type);
            });

        self.broadcast_in_scene(&scene, client_id, ServerUpdate::EntitySpawn(payload))
            .await;
    }

    /// Entity updates are accepted from any occupant of the scene: during
    /// a host handoff the old host's updates may still be in flight after
    /// the flag moved.
    pub(crate) async fn handle_entity_update(
        &self,
        client_id: ClientId,
        payload: EntityUpdatePayload,
    ) {
        let scene = match self
            .sessions
            .with_record(client_id, |record| record.current_scene.clone())
        {
            None => {
                warn!(%client_id, "Entity update from a client with no player record");
                return;
            }
            Some(scene) => scene,
        };
        if scene.is_empty() {
            debug!(%client_id, "Entity update outside any scene, dropping");
            return;
        }

        let entity_id = payload.entity_id;
        self.entities
            .with_state_mut(EntityKey::new(scene.clone(), entity_id), |state| {
                if let Some(position) = payload.position {
                    state.position = Some(position);
                }
                if let Some(scale) = payload.scale {
                    state.scale = Some(scale);
                }
                if let Some(animation) = payload.animation {
                    state.animation = Some(animation);
                }
                if let Some(is_active) = payload.is_active {
                    state.is_active = Some(is_active);
                }
                state.merge_generic_data(&payload.data);
                for update in &payload.host_fsms {
                    state.merge_host_fsm(update.fsm_index, &update.snapshot);
                }
            });

        if let Some(position) = payload.position {
            self.broadcast_in_scene(
                &scene,
                client_id,
                ServerUpdate::EntityPosition {
                    entity_id,
                    position,
                },
            )
            .await;
        }
        if let Some(scale) = payload.scale {
            self.broadcast_in_scene(
                &scene,
                client_id,
                ServerUpdate::EntityScale { entity_id, scale },
            )
            .await;
        }
        if let Some(animation) = payload.animation {
            self.broadcast_in_scene(
                &scene,
                client_id,
                ServerUpdate::EntityAnimation {
                    entity_id,
                    clip_id: animation.clip_id,
                    wrap_mode: animation.wrap_mode,
                },
            )
            .await;
        }
        if let Some(is_active) = payload.is_active {
            self.broadcast_in_scene(
                &scene,
                client_id,
                ServerUpdate::EntityIsActive {
                    entity_id,
                    is_active,
                },
            )
            .await;
        }
        if !payload.data.is_empty() {
            self.broadcast_in_scene(
                &scene,
                client_id,
                ServerUpdate::EntityData {
                    entity_id,
                    entries: payload.data.clone(),
                },
            )
            .await;
        }
        for update in payload.host_fsms {
            self.broadcast_in_scene(
                &scene,
                client_id,
                ServerUpdate::EntityHostFsm {
                    entity_id,
                    fsm_index: update.fsm_index,
                    snapshot: update.snapshot,
                },
            )
            .await;
        }
    }
}
