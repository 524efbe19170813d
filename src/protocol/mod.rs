// Protocol module: wire message types, replicated entity state, validation.

pub mod codes;
pub mod entity;
pub mod messages;
pub mod types;
pub mod validation;

pub use codes::{DisconnectReason, LoginStatus};
pub use entity::{EntityAnimation, EntityDataEntry, EntityDataType, FsmSnapshot, HostFsmUpdate};
pub use messages::{
    AlreadyInScenePayload, ClientUpdate, ConnectedPeer, EnterScenePayload, EntitySpawnPayload,
    EntityUpdatePayload, HelloServerPayload, LoginRequest, LoginResponse, PlayerUpdatePayload,
    ScenePeer, ServerUpdate,
};
pub use types::{
    AddonIdentity, AnimationFrame, ClientId, EntityId, Team, Vec2, Vec3, DASH_END,
};

/// Custom serde module for `bytes::Bytes` payloads.
///
/// Keeps opaque blobs efficient in binary formats while staying readable in
/// JSON-based tests.
pub(crate) mod bytes_serde {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serde_bytes::Bytes::new(bytes.as_ref()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let vec: Vec<u8> = serde_bytes::ByteBuf::deserialize(deserializer)?.into_vec();
        Ok(Bytes::from(vec))
    }
}
