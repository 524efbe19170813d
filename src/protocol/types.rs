use serde::{Deserialize, Serialize};

/// Unique identifier for connected clients, assigned by the transport at
/// connection time and stable for the lifetime of the session.
pub type ClientId = u16;

/// Identifier for a networked entity. Only unique within a scene; the same
/// id in two different scenes names two distinct entities.
pub type EntityId = u16;

/// Clip ids at or above this value are effect/custom clips and never become
/// a player's canonical animation clip.
pub const DASH_END: u16 = 26;

/// A 2D position or map marker coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A 3D vector, used for FSM variable synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Player team assignment. Team membership is global, not scene-scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    #[default]
    None,
    Moss,
    Hive,
    Grimm,
    Lifeblood,
}

/// Identity of a networked addon as presented at login: the exact
/// (identifier, version) pair must match on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonIdentity {
    pub identifier: String,
    pub version: String,
}

/// One animation entry inside a player update. A single update may carry
/// several entries (movement clip plus effect clips); they are forwarded to
/// peers in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationFrame {
    pub clip_id: u16,
    pub frame: u8,
    #[serde(with = "super::bytes_serde", default, skip_serializing_if = "bytes::Bytes::is_empty")]
    pub effect_info: bytes::Bytes,
}

impl AnimationFrame {
    /// Whether this entry may update the player's canonical animation clip.
    pub fn is_canonical(&self) -> bool {
        self.clip_id < DASH_END
    }
}
