use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::codes::{DisconnectReason, LoginStatus};
use super::entity::{EntityAnimation, EntityDataEntry, HostFsmUpdate};
use super::types::{AddonIdentity, AnimationFrame, ClientId, EntityId, Team, Vec2};
use crate::config::ServerSettings;

/// Login request presented by a client before any other traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub auth_key: String,
    #[serde(default)]
    pub addons: Vec<AddonIdentity>,
}

/// Login response. On `InvalidAddons` the server echoes its full networked
/// addon set so the client can report the mismatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub status: LoginStatus,
    /// Server-side numeric addon ids in the order the client presented the
    /// addons (addons the server does not number are skipped).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addon_order: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addons: Vec<AddonIdentity>,
}

impl LoginResponse {
    pub fn success(addon_order: Vec<u8>) -> Self {
        Self {
            status: LoginStatus::Success,
            addon_order,
            addons: Vec::new(),
        }
    }

    pub fn reject(status: LoginStatus) -> Self {
        Self {
            status,
            addon_order: Vec::new(),
            addons: Vec::new(),
        }
    }
}

/// First message after a successful login: announces the player and the
/// scene its save file left it in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloServerPayload {
    pub username: String,
    pub scene: String,
    pub position: Vec2,
    pub scale: bool,
    pub animation_clip: u16,
}

/// Scene transition announcement, carrying the pose the player arrives with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnterScenePayload {
    pub scene: String,
    pub position: Vec2,
    pub scale: bool,
    pub animation_clip: u16,
}

/// Coalesced player state update. Sub-field presence mirrors the wire
/// bit-set: only fields the client flagged are populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerUpdatePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_position: Option<Vec2>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub animation: Vec<AnimationFrame>,
}

/// Entity spawn notice, only valid from the scene host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EntitySpawnPayload {
    pub entity_id: EntityId,
    pub spawning_type: u8,
    pub spawned_type: u8,
}

/// Coalesced entity state update. Also used verbatim to replay cached
/// entity state to late joiners, emitting only the sub-fields present in
/// the cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityUpdatePayload {
    pub entity_id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<EntityAnimation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<EntityDataEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host_fsms: Vec<HostFsmUpdate>,
}

/// Message kinds sent from client to server. The wire encoding keys each
/// variant by a small integer packet id; the router dispatches on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientUpdate {
    HelloServer(HelloServerPayload),
    PlayerEnterScene(EnterScenePayload),
    PlayerLeaveScene,
    PlayerUpdate(PlayerUpdatePayload),
    PlayerMapUpdate { has_icon: bool },
    EntitySpawn(EntitySpawnPayload),
    EntityUpdate(EntityUpdatePayload),
    PlayerDisconnect,
    PlayerDeath,
    PlayerTeamUpdate { team: Team },
    PlayerSkinUpdate { skin_id: u8 },
    ChatMessage { message: String },
}

impl ClientUpdate {
    /// Wire packet id of this message kind.
    pub fn packet_id(&self) -> u8 {
        match self {
            Self::HelloServer(_) => 0,
            Self::PlayerEnterScene(_) => 1,
            Self::PlayerLeaveScene => 2,
            Self::PlayerUpdate(_) => 3,
            Self::PlayerMapUpdate { .. } => 4,
            Self::EntitySpawn(_) => 5,
            Self::EntityUpdate(_) => 6,
            Self::PlayerDisconnect => 7,
            Self::PlayerDeath => 8,
            Self::PlayerTeamUpdate { .. } => 9,
            Self::PlayerSkinUpdate { .. } => 10,
            Self::ChatMessage { .. } => 11,
        }
    }
}

/// Identity of an already-connected player, sent to a fresh client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedPeer {
    pub client_id: ClientId,
    pub username: String,
}

/// Full identity and pose of a player entering a scene, as seen by peers
/// already in that scene (and by the entering player for each such peer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenePeer {
    pub client_id: ClientId,
    pub username: String,
    pub position: Vec2,
    pub scale: bool,
    pub team: Team,
    pub skin_id: u8,
    pub animation_clip: u16,
}

/// Bootstrap payload for a player entering a scene: who is already there,
/// which entities are spawned, and the replayed entity state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlreadyInScenePayload {
    pub peers: Vec<ScenePeer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_spawns: Vec<EntitySpawnPayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_updates: Vec<EntityUpdatePayload>,
    pub scene_host: bool,
}

/// Message kinds sent from server to client: the wire vocabulary the core
/// enqueues onto per-client outboxes. The transport coalesces queued
/// updates into reliable/unreliable frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerUpdate {
    LoginResponse(LoginResponse),
    /// Hello response: every other connected player.
    HelloClient { peers: Vec<ConnectedPeer> },
    PlayerConnect { client_id: ClientId, username: String },
    PlayerDisconnect {
        client_id: ClientId,
        username: String,
        timed_out: bool,
    },
    PlayerEnterScene(ScenePeer),
    PlayerLeaveScene { client_id: ClientId },
    PlayerAlreadyInScene(Box<AlreadyInScenePayload>),
    PlayerDeath { client_id: ClientId },
    PlayerTeamUpdate {
        client_id: ClientId,
        username: String,
        team: Team,
    },
    PlayerSkinUpdate { client_id: ClientId, skin_id: u8 },
    ChatMessage { message: String },
    PlayerPosition { client_id: ClientId, position: Vec2 },
    PlayerScale { client_id: ClientId, scale: bool },
    PlayerMapIcon { client_id: ClientId, has_icon: bool },
    PlayerMapPosition { client_id: ClientId, position: Vec2 },
    PlayerAnimation {
        client_id: ClientId,
        clip_id: u16,
        frame: u8,
        #[serde(with = "super::bytes_serde", default, skip_serializing_if = "Bytes::is_empty")]
        effect_info: Bytes,
    },
    EntitySpawn(EntitySpawnPayload),
    EntityPosition { entity_id: EntityId, position: Vec2 },
    EntityScale { entity_id: EntityId, scale: bool },
    EntityAnimation {
        entity_id: EntityId,
        clip_id: u8,
        wrap_mode: u8,
    },
    EntityIsActive { entity_id: EntityId, is_active: bool },
    EntityData {
        entity_id: EntityId,
        entries: Vec<EntityDataEntry>,
    },
    EntityHostFsm {
        entity_id: EntityId,
        fsm_index: u8,
        snapshot: super::entity::FsmSnapshot,
    },
    /// The recipient is now the authoritative simulator for its scene.
    SceneHostTransfer,
    ServerSettings(ServerSettings),
    Disconnect { reason: DisconnectReason },
}
