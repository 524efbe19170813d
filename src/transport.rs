//! Transport capability consumed by the relay core.
//!
//! The actual UDP transport (framing, acknowledgement, retransmission,
//! coalescing of queued updates into reliable/unreliable frames) lives
//! outside this crate; the core only enqueues [`ServerUpdate`]s onto
//! per-client outboxes and reacts to the connection events the transport
//! surfaces. An in-memory [`ChannelTransport`] is provided for embedders
//! that drive the core directly and for the test suite.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::{ClientId, ServerUpdate};

/// Per-client outbox. Enqueues are cheap and effectively non-blocking; the
/// transport drains the queue into outbound frames for that client.
#[derive(Debug, Clone)]
pub struct ClientOutbox {
    client_id: ClientId,
    sender: mpsc::Sender<Arc<ServerUpdate>>,
}

impl ClientOutbox {
    pub fn new(client_id: ClientId, sender: mpsc::Sender<Arc<ServerUpdate>>) -> Self {
        Self { client_id, sender }
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Enqueue an update for this client. A closed or saturated queue is
    /// logged and dropped; the disconnect path will reap the client.
    pub async fn send(&self, update: Arc<ServerUpdate>) {
        if self.sender.send(update).await.is_err() {
            debug!(client_id = %self.client_id, "Dropping update for closed outbox");
        }
    }

    /// Enqueue a chat message, splitting multi-line text into one chat
    /// frame per line.
    pub async fn send_chat(&self, text: &str) {
        for line in text.split('\n') {
            self.send(Arc::new(ServerUpdate::ChatMessage {
                message: line.to_string(),
            }))
            .await;
        }
    }
}

/// Capability the core consumes to reach clients. Implemented by the real
/// UDP transport outside this crate and by [`ChannelTransport`] here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn start_listening(&self, port: u16) -> anyhow::Result<()>;
    async fn stop(&self) -> anyhow::Result<()>;
    fn is_started(&self) -> bool;

    /// Outbox for one client, or `None` when no such client is connected.
    fn outbox_for(&self, client_id: ClientId) -> Option<ClientOutbox>;

    /// Outboxes of every connected client, used for settings pushes and
    /// shutdown fan-out.
    fn outboxes(&self) -> Vec<ClientOutbox>;

    /// Close a client's connection after its final frame has been queued.
    /// Not called on timeout: the transport has already closed that client.
    async fn close_client(&self, client_id: ClientId);
}

/// In-memory transport backed by per-client bounded channels.
pub struct ChannelTransport {
    clients: DashMap<ClientId, ClientOutbox>,
    outbox_capacity: usize,
    started: AtomicBool,
}

impl ChannelTransport {
    pub fn new(outbox_capacity: usize) -> Self {
        Self {
            clients: DashMap::new(),
            outbox_capacity,
            started: AtomicBool::new(false),
        }
    }

    /// Register a client and hand back the receiving end of its outbox.
    /// Fails when the id is already connected.
    pub fn register_client(
        &self,
        client_id: ClientId,
    ) -> anyhow::Result<mpsc::Receiver<Arc<ServerUpdate>>> {
        let (sender, receiver) = mpsc::channel(self.outbox_capacity);
        match self.clients.entry(client_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                anyhow::bail!("client id {client_id} is already connected")
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(ClientOutbox::new(client_id, sender));
                Ok(receiver)
            }
        }
    }

    pub fn remove_client(&self, client_id: ClientId) {
        self.clients.remove(&client_id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn start_listening(&self, port: u16) -> anyhow::Result<()> {
        debug!(%port, "Channel transport started (port is nominal)");
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.started.store(false, Ordering::SeqCst);
        self.clients.clear();
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn outbox_for(&self, client_id: ClientId) -> Option<ClientOutbox> {
        self.clients.get(&client_id).map(|entry| entry.value().clone())
    }

    fn outboxes(&self) -> Vec<ClientOutbox> {
        self.clients.iter().map(|entry| entry.value().clone()).collect()
    }

    async fn close_client(&self, client_id: ClientId) {
        if self.clients.remove(&client_id).is_none() {
            warn!(%client_id, "Close requested for unknown client");
        }
    }
}
