use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::access::AccessLists;
use crate::addons::AddonRegistry;
use crate::command::CommandBus;
use crate::config::{ServerConfig, ServerSettings};
use crate::events::{EventEmitter, PlayerChatEvent, PlayerConnectEvent, PlayerDisconnectEvent};
use crate::protocol::ClientId;
use crate::transport::Transport;

mod admin;
mod admission;
mod api;
mod chat;
mod entity_cache;
mod entity_relay;
mod lifecycle;
mod messaging;
mod scene_host;
mod session;
mod settings;
mod update_router;

pub use api::ServerApi;
pub use entity_cache::{EntityCache, EntityKey, EntityState};
pub use session::{DuplicateIdError, Lifecycle, PlayerRecord, SessionTable, TYPICAL_SCENE_SIZE};

/// Errors surfaced to external callers (CLI, addons) that violated an
/// argument contract. Handler paths never raise these.
#[derive(Debug, Error)]
pub enum ServerApiError {
    #[error("no connected player with id {0}")]
    UnknownClient(ClientId),
    #[error("chat message exceeds maximum length ({length}/{max})")]
    MessageTooLong { length: usize, max: usize },
}

/// Entry in the player listing offered to the admin surface.
#[derive(Debug, Clone)]
pub struct PlayerListEntry {
    pub id: ClientId,
    pub username: String,
    pub scene: String,
}

/// The relay core: session manager, scene-scoped broadcast fabric, scene
/// host election, and entity state cache.
///
/// The transport invokes the `handle_*` methods from its worker tasks;
/// nothing here assumes single-threaded dispatch. Handlers never return
/// errors to the transport: anomalies are logged and the per-client frame
/// loop continues.
pub struct RelayServer {
    pub(crate) config: ServerConfig,
    pub(crate) sessions: SessionTable,
    pub(crate) entities: EntityCache,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) access: Arc<dyn AccessLists>,
    pub(crate) addons: AddonRegistry,
    pub(crate) command_bus: Arc<dyn CommandBus>,
    pub(crate) settings: RwLock<ServerSettings>,
    /// Per-scene locks serializing enter/leave transitions with the host
    /// election and cache purge that depend on them.
    scene_locks: DashMap<String, Arc<Mutex<()>>>,
    /// Serializes admission so two concurrent logins cannot both claim the
    /// same username.
    pub(crate) login_lock: Mutex<()>,
    pub(crate) chat_events: EventEmitter<PlayerChatEvent>,
    pub(crate) connect_events: EventEmitter<PlayerConnectEvent>,
    pub(crate) disconnect_events: EventEmitter<PlayerDisconnectEvent>,
}

impl RelayServer {
    pub fn new(
        config: ServerConfig,
        settings: ServerSettings,
        transport: Arc<dyn Transport>,
        access: Arc<dyn AccessLists>,
        addons: AddonRegistry,
        command_bus: Arc<dyn CommandBus>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            sessions: SessionTable::new(),
            entities: EntityCache::new(),
            transport,
            access,
            addons,
            command_bus,
            settings: RwLock::new(settings),
            scene_locks: DashMap::new(),
            login_lock: Mutex::new(()),
            chat_events: EventEmitter::new(),
            connect_events: EventEmitter::new(),
            disconnect_events: EventEmitter::new(),
        })
    }

    /// Ask the transport to start accepting clients.
    pub async fn start(&self) -> anyhow::Result<()> {
        self.transport.start_listening(self.config.port).await
    }

    pub fn is_started(&self) -> bool {
        self.transport.is_started()
    }

    pub fn player_count(&self) -> usize {
        self.sessions.len()
    }

    fn scene_lock(&self, scene: &str) -> Arc<Mutex<()>> {
        self.scene_locks
            .entry(scene.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Serialize transitions touching one scene.
    pub(crate) async fn lock_scene(&self, scene: &str) -> OwnedMutexGuard<()> {
        self.scene_lock(scene).lock_owned().await
    }

    /// Serialize a transition touching two scenes. Locks are taken in
    /// lexicographic order so concurrent opposite transitions cannot
    /// deadlock.
    pub(crate) async fn lock_scene_pair(
        &self,
        a: &str,
        b: &str,
    ) -> (OwnedMutexGuard<()>, Option<OwnedMutexGuard<()>>) {
        if a == b {
            return (self.lock_scene(a).await, None);
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first_guard = self.lock_scene(first).await;
        let second_guard = self.lock_scene(second).await;
        (first_guard, Some(second_guard))
    }
}
