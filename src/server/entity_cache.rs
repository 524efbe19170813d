//! Replicated entity state cache, keyed by (scene, entity id). Used to
//! bootstrap late joiners and purged in bulk when a scene empties.

use std::collections::HashMap;

use dashmap::DashMap;

use crate::protocol::{
    EntityAnimation, EntityDataEntry, EntityId, EntitySpawnPayload, EntityUpdatePayload,
    FsmSnapshot, Vec2,
};

/// Cache key. Entities with the same id in different scenes are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub scene: String,
    pub entity_id: EntityId,
}

impl EntityKey {
    pub fn new(scene: impl Into<String>, entity_id: EntityId) -> Self {
        Self {
            scene: scene.into(),
            entity_id,
        }
    }
}

/// Last-known replicated state of one entity.
#[derive(Debug, Clone, Default)]
pub struct EntityState {
    pub spawned: bool,
    pub spawning_type: u8,
    pub spawned_type: u8,
    pub position: Option<Vec2>,
    pub scale: Option<bool>,
    pub animation: Option<EntityAnimation>,
    pub is_active: Option<bool>,
    pub generic_data: Vec<EntityDataEntry>,
    pub host_fsm_data: HashMap<u8, FsmSnapshot>,
}

impl EntityState {
    pub fn mark_spawned(&mut self, spawning_type: u8, spawned_type: u8) {
        self.spawned = true;
        self.spawning_type = spawning_type;
        self.spawned_type = spawned_type;
    }

    /// Merge a batch of generic data entries: Rotation and Collider
    /// replace the previous value of the same type, everything else
    /// appends.
    pub fn merge_generic_data(&mut self, entries: &[EntityDataEntry]) {
        for entry in entries {
            if entry.data_type.replaces() {
                if let Some(existing) = self
                    .generic_data
                    .iter_mut()
                    .find(|e| e.data_type == entry.data_type)
                {
                    existing.payload = entry.payload.clone();
                    continue;
                }
            }
            self.generic_data.push(entry.clone());
        }
    }

    pub fn merge_host_fsm(&mut self, fsm_index: u8, snapshot: &FsmSnapshot) {
        self.host_fsm_data
            .entry(fsm_index)
            .or_default()
            .merge(snapshot);
    }

    /// Spawn notice for this entity, if it was spawned by a scene host.
    pub fn spawn_payload(&self, entity_id: EntityId) -> Option<EntitySpawnPayload> {
        self.spawned.then_some(EntitySpawnPayload {
            entity_id,
            spawning_type: self.spawning_type,
            spawned_type: self.spawned_type,
        })
    }

    /// Replay update carrying every sub-field present in the cache.
    pub fn replay_payload(&self, entity_id: EntityId) -> EntityUpdatePayload {
        let mut host_fsms: Vec<_> = self
            .host_fsm_data
            .iter()
            .map(|(index, snapshot)| crate::protocol::HostFsmUpdate {
                fsm_index: *index,
                snapshot: snapshot.clone(),
            })
            .collect();
        host_fsms.sort_by_key(|update| update.fsm_index);

        EntityUpdatePayload {
            entity_id,
            position: self.position,
            scale: self.scale,
            animation: self.animation,
            is_active: self.is_active,
            data: self.generic_data.clone(),
            host_fsms,
        }
    }
}

/// Concurrent (scene, entity) → state mapping.
#[derive(Default)]
pub struct EntityCache {
    entities: DashMap<EntityKey, EntityState>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the state for `key`, creating it first if absent.
    /// The closure must not touch the cache.
    pub fn with_state_mut<R>(&self, key: EntityKey, f: impl FnOnce(&mut EntityState) -> R) -> R {
        let mut entry = self.entities.entry(key).or_default();
        f(entry.value_mut())
    }

    pub fn get(&self, key: &EntityKey) -> Option<EntityState> {
        self.entities.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn clear(&self) {
        self.entities.clear();
    }

    /// Drop every entity belonging to the scene. Called only after the
    /// scene's last occupant has had its scene membership cleared.
    pub fn purge_scene(&self, scene: &str) {
        self.entities.retain(|key, _| key.scene != scene);
    }

    /// Copy of every entity in the scene, ordered by entity id so replay
    /// is deterministic.
    pub fn snapshot_scene(&self, scene: &str) -> Vec<(EntityKey, EntityState)> {
        let mut entities: Vec<_> = self
            .entities
            .iter()
            .filter(|entry| entry.key().scene == scene)
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entities.sort_by_key(|(key, _)| key.entity_id);
        entities
    }
}
