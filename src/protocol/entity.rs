//! Replicated entity state carried on the wire and merged into the cache.

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::types::{Vec2, Vec3};

/// Discriminant for a generic entity data blob. The server does not
/// interpret payloads; the type only selects the merge rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityDataType(pub u8);

impl EntityDataType {
    pub const ROTATION: Self = Self(0);
    pub const COLLIDER: Self = Self(1);

    /// Data types for which a later value replaces the earlier value with
    /// the same type; every other type is append-only.
    pub fn replaces(self) -> bool {
        self == Self::ROTATION || self == Self::COLLIDER
    }
}

/// A single opaque data blob attached to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDataEntry {
    pub data_type: EntityDataType,
    #[serde(with = "super::bytes_serde")]
    pub payload: Bytes,
}

/// Animation state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAnimation {
    pub clip_id: u8,
    pub wrap_mode: u8,
}

/// Snapshot of one FSM owned by the scene host. Carries the current state
/// plus whichever keyed variables changed since the last snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FsmSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<u8>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub floats: HashMap<u8, f32>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub ints: HashMap<u8, i32>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub bools: HashMap<u8, bool>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub strings: HashMap<u8, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub vec2s: HashMap<u8, Vec2>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub vec3s: HashMap<u8, Vec3>,
}

impl FsmSnapshot {
    pub fn is_empty(&self) -> bool {
        self.current_state.is_none()
            && self.floats.is_empty()
            && self.ints.is_empty()
            && self.bools.is_empty()
            && self.strings.is_empty()
            && self.vec2s.is_empty()
            && self.vec3s.is_empty()
    }

    /// Merge a later snapshot into this one: the result holds the union of
    /// keys, and each key takes the most recently received value.
    pub fn merge(&mut self, newer: &FsmSnapshot) {
        if newer.current_state.is_some() {
            self.current_state = newer.current_state;
        }
        self.floats.extend(&newer.floats);
        self.ints.extend(&newer.ints);
        self.bools.extend(&newer.bools);
        for (key, value) in &newer.strings {
            self.strings.insert(*key, value.clone());
        }
        self.vec2s.extend(&newer.vec2s);
        self.vec3s.extend(&newer.vec3s);
    }
}

/// Update to one FSM of an entity, addressed by FSM index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostFsmUpdate {
    pub fsm_index: u8,
    pub snapshot: FsmSnapshot,
}
