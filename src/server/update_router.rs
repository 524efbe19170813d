//! Ingress dispatch: one handler per message kind, fan-out mediated by
//! scene membership.

use tracing::{debug, warn};

use super::RelayServer;
use crate::protocol::{ClientId, ClientUpdate, PlayerUpdatePayload, ServerUpdate, Team};

impl RelayServer {
    /// Dispatch one inbound update. Invoked by the transport from its
    /// worker tasks; frames from a single client arrive in order, frames
    /// from different clients interleave freely.
    pub async fn handle_update(&self, client_id: ClientId, update: ClientUpdate) {
        match update {
            ClientUpdate::HelloServer(payload) => self.handle_hello(client_id, payload).await,
            ClientUpdate::PlayerEnterScene(payload) => {
                self.handle_enter_scene(client_id, payload).await;
            }
            ClientUpdate::PlayerLeaveScene => self.handle_leave_scene(client_id).await,
            ClientUpdate::PlayerUpdate(payload) => {
                self.handle_player_update(client_id, payload).await;
            }
            ClientUpdate::PlayerMapUpdate { has_icon } => {
                self.handle_map_update(client_id, has_icon).await;
            }
            ClientUpdate::EntitySpawn(payload) => {
                self.handle_entity_spawn(client_id, payload).await;
            }
            ClientUpdate::EntityUpdate(payload) => {
                self.handle_entity_update(client_id, payload).await;
            }
            ClientUpdate::PlayerDisconnect => {
                self.disconnect_internal(client_id, false).await;
                self.transport.close_client(client_id).await;
            }
            ClientUpdate::PlayerDeath => self.handle_player_death(client_id).await,
            ClientUpdate::PlayerTeamUpdate { team } => {
                self.handle_team_update(client_id, team).await;
            }
            ClientUpdate::PlayerSkinUpdate { skin_id } => {
                self.handle_skin_update(client_id, skin_id).await;
            }
            ClientUpdate::ChatMessage { message } => self.handle_chat(client_id, message).await,
        }
    }

    /// Coalesced pose update: every present sub-field updates the record
    /// and is forwarded to the sender's scene peers.
    async fn handle_player_update(&self, client_id: ClientId, payload: PlayerUpdatePayload) {
        let context = self.sessions.with_record_mut(client_id, |record| {
            if !record.is_active() {
                return None;
            }
            if let Some(position) = payload.position {
                record.position = position;
            }
            if let Some(scale) = payload.scale {
                record.scale = scale;
            }
            if let Some(canonical) = payload.animation.iter().rev().find(|f| f.is_canonical()) {
                record.animation_clip = canonical.clip_id;
            }
            if let Some(map_position) = payload.map_position {
                record.map_position = Some(map_position);
            }
            Some((record.current_scene.clone(), record.has_map_icon))
        });

        let (scene, has_map_icon) = match context {
            None => {
                warn!(%client_id, "Player update from a client with no player record");
                return;
            }
            Some(None) => {
                warn!(%client_id, "Player update before hello, dropping");
                return;
            }
            Some(Some(context)) => context,
        };

        if !scene.is_empty() {
            if let Some(position) = payload.position {
                self.broadcast_in_scene(
                    &scene,
                    client_id,
                    ServerUpdate::PlayerPosition {
                        client_id,
                        position,
                    },
                )
                .await;
            }
            if let Some(scale) = payload.scale {
                self.broadcast_in_scene(
                    &scene,
                    client_id,
                    ServerUpdate::PlayerScale { client_id, scale },
                )
                .await;
            }
            for frame in &payload.animation {
                self.broadcast_in_scene(
                    &scene,
                    client_id,
                    ServerUpdate::PlayerAnimation {
                        client_id,
                        clip_id: frame.clip_id,
                        frame: frame.frame,
                        effect_info: frame.effect_info.clone(),
                    },
                )
                .await;
            }
        }

        if let Some(position) = payload.map_position {
            let gate = self.settings.read().await.map_broadcast_enabled();
            if gate && has_map_icon {
                // Map markers are visible across the whole world map, so
                // this fan-out is not scene-filtered.
                self.broadcast_active(
                    client_id,
                    ServerUpdate::PlayerMapPosition {
                        client_id,
                        position,
                    },
                )
                .await;
            }
        }
    }

    async fn handle_map_update(&self, client_id: ClientId, has_icon: bool) {
        let context = self.sessions.with_record_mut(client_id, |record| {
            if !record.is_active() {
                return None;
            }
            record.has_map_icon = has_icon;
            Some(record.map_position)
        });

        let cached_position = match context {
            None => {
                warn!(%client_id, "Map update from a client with no player record");
                return;
            }
            Some(None) => {
                warn!(%client_id, "Map update before hello, dropping");
                return;
            }
            Some(Some(position)) => position,
        };

        self.broadcast_active(
            client_id,
            ServerUpdate::PlayerMapIcon {
                client_id,
                has_icon,
            },
        )
        .await;

        if has_icon {
            if let Some(position) = cached_position {
                self.broadcast_active(
                    client_id,
                    ServerUpdate::PlayerMapPosition {
                        client_id,
                        position,
                    },
                )
                .await;
            }
        }
    }

    async fn handle_player_death(&self, client_id: ClientId) {
        let scene = match self
            .sessions
            .with_record(client_id, |record| record.current_scene.clone())
        {
            None => {
                warn!(%client_id, "Death notice from a client with no player record");
                return;
            }
            Some(scene) => scene,
        };
        if scene.is_empty() {
            debug!(%client_id, "Death notice outside any scene, dropping");
            return;
        }
        self.broadcast_in_scene(&scene, client_id, ServerUpdate::PlayerDeath { client_id })
            .await;
    }

    /// Teams are global, so the update is not scene-filtered.
    async fn handle_team_update(&self, client_id: ClientId, team: Team) {
        let username = match self.sessions.with_record_mut(client_id, |record| {
            record.is_active().then(|| {
                record.team = team;
                record.username.clone()
            })
        }) {
            None | Some(None) => {
                warn!(%client_id, "Team update from an unknown or reserved client");
                return;
            }
            Some(Some(username)) => username,
        };

        self.broadcast_active(
            client_id,
            ServerUpdate::PlayerTeamUpdate {
                client_id,
                username,
                team,
            },
        )
        .await;
    }

    /// Skins are cosmetic and scene-local; unchanged skins are not
    /// rebroadcast.
    async fn handle_skin_update(&self, client_id: ClientId, skin_id: u8) {
        let scene = match self.sessions.with_record_mut(client_id, |record| {
            if !record.is_active() || record.skin_id == skin_id {
                return None;
            }
            record.skin_id = skin_id;
            Some(record.current_scene.clone())
        }) {
            None => {
                warn!(%client_id, "Skin update from a client with no player record");
                return;
            }
            Some(None) => return,
            Some(Some(scene)) => scene,
        };

        if !scene.is_empty() {
            self.broadcast_in_scene(
                &scene,
                client_id,
                ServerUpdate::PlayerSkinUpdate { client_id, skin_id },
            )
            .await;
        }
    }
}
