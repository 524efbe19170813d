//! Subscriber-list event emission.
//!
//! Subscriptions return handles; emission iterates a snapshot of the
//! subscriber list and isolates every callback, so one misbehaving
//! subscriber can neither skip the others nor abort the emitting handler.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::error;

use crate::protocol::{ClientId, Team, Vec2};

type Callback<E> = Arc<dyn Fn(&mut E) -> anyhow::Result<()> + Send + Sync>;

/// Handle returned by [`EventEmitter::subscribe`]; pass it back to
/// [`EventEmitter::unsubscribe`] to remove the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle(u64);

pub struct EventEmitter<E> {
    next_id: AtomicU64,
    subscribers: DashMap<u64, Callback<E>>,
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            subscribers: DashMap::new(),
        }
    }
}

impl<E> EventEmitter<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&mut E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(id, Arc::new(callback));
        SubscriptionHandle(id)
    }

    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.subscribers.remove(&handle.0);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Run every subscriber against the event. Errors and panics are
    /// logged and do not reach the caller.
    pub fn emit(&self, event: &mut E) {
        let snapshot: Vec<(u64, Callback<E>)> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        for (id, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(subscriber = id, %err, "Event subscriber failed");
                }
                Err(_) => {
                    error!(subscriber = id, "Event subscriber panicked");
                }
            }
        }
    }
}

/// A chat line that was not consumed as a command. Subscribers may cancel
/// it to suppress the broadcast.
#[derive(Debug, Clone)]
pub struct PlayerChatEvent {
    pub client_id: ClientId,
    pub username: String,
    pub message: String,
    cancelled: bool,
}

impl PlayerChatEvent {
    pub fn new(client_id: ClientId, username: String, message: String) -> Self {
        Self {
            client_id,
            username,
            message,
            cancelled: false,
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// A player finished its hello and is visible to other players.
#[derive(Debug, Clone)]
pub struct PlayerConnectEvent {
    pub client_id: ClientId,
    pub username: String,
    pub team: Team,
    pub position: Vec2,
}

/// A player disconnected or timed out.
#[derive(Debug, Clone)]
pub struct PlayerDisconnectEvent {
    pub client_id: ClientId,
    pub username: String,
    pub timed_out: bool,
}
