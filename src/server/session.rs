//! Session table: the authoritative mapping from client id to player
//! record, plus the scene-membership queries every fan-out goes through.

use dashmap::DashMap;
use smallvec::SmallVec;
use thiserror::Error;

use crate::protocol::{ClientId, ConnectedPeer, ScenePeer, Team, Vec2};

/// Number of players a scene typically holds; membership lists this small
/// stay on the stack.
pub const TYPICAL_SCENE_SIZE: usize = 8;

/// Stack-friendly list of client ids in one scene.
pub type SceneMembers = SmallVec<[ClientId; TYPICAL_SCENE_SIZE]>;

/// Progress of a client through the connection handshake.
///
/// A `Reserved` record exists from login-accept until the first hello. It
/// holds the id and username (so admission can enforce uniqueness) but is
/// invisible to every egress path: no broadcast may target it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Reserved,
    Greeted,
    InScene,
    /// Claimed by the disconnect path; makes a second disconnect for the
    /// same id a no-op.
    Departed,
}

/// Per-player state owned by the session table.
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub id: ClientId,
    pub remote_addr: String,
    pub username: String,
    pub auth_key: String,
    pub lifecycle: Lifecycle,
    /// Empty between scenes; fan-out membership is derived from this.
    pub current_scene: String,
    pub position: Vec2,
    pub scale: bool,
    pub animation_clip: u16,
    pub team: Team,
    pub skin_id: u8,
    pub map_position: Option<Vec2>,
    pub has_map_icon: bool,
    pub is_scene_host: bool,
}

impl PlayerRecord {
    /// A freshly admitted record, not yet visible to other players.
    pub fn reserved(id: ClientId, remote_addr: String, username: String, auth_key: String) -> Self {
        Self {
            id,
            remote_addr,
            username,
            auth_key,
            lifecycle: Lifecycle::Reserved,
            current_scene: String::new(),
            position: Vec2::default(),
            scale: false,
            animation_clip: 0,
            team: Team::None,
            skin_id: 0,
            map_position: None,
            has_map_icon: false,
            is_scene_host: false,
        }
    }

    /// Whether the record may be addressed by egress at all.
    pub fn is_active(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Greeted | Lifecycle::InScene)
    }

    pub fn in_scene(&self, scene: &str) -> bool {
        self.lifecycle == Lifecycle::InScene && self.current_scene == scene
    }

    /// Identity and pose as seen by scene peers.
    pub fn scene_peer(&self) -> ScenePeer {
        ScenePeer {
            client_id: self.id,
            username: self.username.clone(),
            position: self.position,
            scale: self.scale,
            team: self.team,
            skin_id: self.skin_id,
            animation_clip: self.animation_clip,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("client id {0} already has a player record")]
pub struct DuplicateIdError(pub ClientId);

/// Concurrent id → record mapping. Mutations go through shard-guarded
/// closures; iteration-based queries are weakly consistent and never
/// observe a partially constructed record.
#[derive(Default)]
pub struct SessionTable {
    records: DashMap<ClientId, PlayerRecord>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under its own id. Fails when the id is present.
    pub fn insert(&self, record: PlayerRecord) -> Result<(), DuplicateIdError> {
        match self.records.entry(record.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(DuplicateIdError(record.id)),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(record);
                Ok(())
            }
        }
    }

    pub fn remove(&self, id: ClientId) -> Option<PlayerRecord> {
        self.records.remove(&id).map(|(_, record)| record)
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&self) {
        self.records.clear();
    }

    /// Read access to one record. The closure must not touch the table.
    pub fn with_record<R>(&self, id: ClientId, f: impl FnOnce(&PlayerRecord) -> R) -> Option<R> {
        self.records.get(&id).map(|record| f(&record))
    }

    /// Write access to one record. The closure must not touch the table.
    pub fn with_record_mut<R>(
        &self,
        id: ClientId,
        f: impl FnOnce(&mut PlayerRecord) -> R,
    ) -> Option<R> {
        self.records.get_mut(&id).map(|mut record| f(&mut record))
    }

    /// Ids of every active record in the scene, excluding `except`.
    pub fn peers_in_scene(&self, scene: &str, except: ClientId) -> SceneMembers {
        self.records
            .iter()
            .filter(|entry| entry.id != except && entry.in_scene(scene))
            .map(|entry| entry.id)
            .collect()
    }

    /// Ids of every active record.
    pub fn active_ids(&self) -> SceneMembers {
        self.records
            .iter()
            .filter(|entry| entry.is_active())
            .map(|entry| entry.id)
            .collect()
    }

    /// Ids of every active record, excluding `except`.
    pub fn active_peers(&self, except: ClientId) -> SceneMembers {
        self.records
            .iter()
            .filter(|entry| entry.id != except && entry.is_active())
            .map(|entry| entry.id)
            .collect()
    }

    /// First other active record in the scene by iteration order; the
    /// host elector's successor pick.
    pub fn first_peer_in_scene(&self, scene: &str, except: ClientId) -> Option<ClientId> {
        self.records
            .iter()
            .find(|entry| entry.id != except && entry.in_scene(scene))
            .map(|entry| entry.id)
    }

    pub fn is_scene_empty(&self, scene: &str) -> bool {
        !self
            .records
            .iter()
            .any(|entry| entry.in_scene(scene))
    }

    /// Identity and pose of every active record in the scene.
    pub fn scene_peers(&self, scene: &str, except: ClientId) -> Vec<ScenePeer> {
        self.records
            .iter()
            .filter(|entry| entry.id != except && entry.in_scene(scene))
            .map(|entry| entry.scene_peer())
            .collect()
    }

    /// Identity of every active record, for the hello response.
    pub fn connected_peers(&self, except: ClientId) -> Vec<ConnectedPeer> {
        self.records
            .iter()
            .filter(|entry| entry.id != except && entry.is_active())
            .map(|entry| ConnectedPeer {
                client_id: entry.id,
                username: entry.username.clone(),
            })
            .collect()
    }

    /// Whether any record (reserved included) holds this username,
    /// case-insensitively.
    pub fn username_taken(&self, username: &str) -> bool {
        self.records
            .iter()
            .any(|entry| crate::protocol::validation::usernames_equal(&entry.username, username))
    }

    /// Weakly consistent copy of every record.
    pub fn snapshot(&self) -> Vec<PlayerRecord> {
        self.records.iter().map(|entry| entry.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: ClientId, username: &str, scene: &str) -> PlayerRecord {
        let mut record = PlayerRecord::reserved(
            id,
            format!("10.0.0.{id}:26950"),
            username.to_string(),
            format!("key-{id}"),
        );
        if !scene.is_empty() {
            record.lifecycle = Lifecycle::InScene;
            record.current_scene = scene.to_string();
        }
        record
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let table = SessionTable::new();
        table.insert(record(7, "Alice", "Town")).unwrap();
        assert_eq!(
            table.insert(record(7, "Other", "Town")),
            Err(DuplicateIdError(7))
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn scene_queries_exclude_reserved_and_other_scenes() {
        let table = SessionTable::new();
        table.insert(record(1, "Alice", "Town")).unwrap();
        table.insert(record(2, "Bob", "Town")).unwrap();
        table.insert(record(3, "Carol", "Forest")).unwrap();
        table.insert(record(4, "Dan", "")).unwrap(); // reserved

        let peers = table.peers_in_scene("Town", 1);
        assert_eq!(peers.as_slice(), &[2]);

        assert!(!table.is_scene_empty("Forest"));
        assert!(table.is_scene_empty("Crossroads"));

        // Reserved records are invisible to the active-peer view as well
        let active = table.active_peers(1);
        assert!(active.contains(&2) && active.contains(&3) && !active.contains(&4));
    }

    #[test]
    fn username_lookup_is_case_insensitive_and_sees_reserved() {
        let table = SessionTable::new();
        table.insert(record(9, "Alice", "")).unwrap();
        assert!(table.username_taken("ALICE"));
        assert!(table.username_taken("alice"));
        assert!(!table.username_taken("Bob"));
    }

    #[test]
    fn first_peer_pick_skips_the_leaver() {
        let table = SessionTable::new();
        table.insert(record(1, "Alice", "Town")).unwrap();
        table.insert(record(2, "Bob", "Town")).unwrap();

        let successor = table.first_peer_in_scene("Town", 1);
        assert_eq!(successor, Some(2));
        assert_eq!(table.first_peer_in_scene("Town", 2), Some(1));
    }
}
