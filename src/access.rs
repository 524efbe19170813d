//! Access lists consumed by admission control and chat authorization.
//!
//! Persistence is the implementation's concern; the core only asks
//! questions and requests mutations. [`MemoryAccessLists`] is the
//! in-memory implementation used by tests and small deployments.

use dashmap::DashSet;
use std::sync::atomic::{AtomicBool, Ordering};

/// Ban list, whitelist (with username pre-list), and authorized-key list.
///
/// Implementations must make `promote_prelisted` atomic: a username can be
/// promoted at most once, and promotion both inserts the key into the
/// whitelist and removes the username from the pre-list. Usernames are
/// matched case-insensitively.
pub trait AccessLists: Send + Sync {
    fn is_banned(&self, remote_addr: &str, auth_key: &str) -> bool;
    fn whitelist_enabled(&self) -> bool;
    fn is_whitelisted(&self, auth_key: &str) -> bool;
    /// If the username is pre-listed, move the auth key into the whitelist,
    /// drop the username from the pre-list, and return true.
    fn promote_prelisted(&self, username: &str, auth_key: &str) -> bool;
    fn is_authorized(&self, auth_key: &str) -> bool;

    fn ban_address(&self, remote_addr: &str);
    fn ban_key(&self, auth_key: &str);
    fn unban_address(&self, remote_addr: &str);
    fn unban_key(&self, auth_key: &str);
    fn set_whitelist_enabled(&self, enabled: bool);
    fn add_whitelisted(&self, auth_key: &str);
    fn remove_whitelisted(&self, auth_key: &str);
    fn add_prelisted(&self, username: &str);
    fn remove_prelisted(&self, username: &str);
    fn authorize_key(&self, auth_key: &str);
    fn deauthorize_key(&self, auth_key: &str);
}

/// In-memory access lists.
#[derive(Default)]
pub struct MemoryAccessLists {
    banned_addresses: DashSet<String>,
    banned_keys: DashSet<String>,
    whitelist: DashSet<String>,
    /// Lowercased usernames whose first login is admitted and promoted.
    prelist: DashSet<String>,
    authorized: DashSet<String>,
    whitelist_enabled: AtomicBool,
}

impl MemoryAccessLists {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccessLists for MemoryAccessLists {
    fn is_banned(&self, remote_addr: &str, auth_key: &str) -> bool {
        self.banned_addresses.contains(remote_addr) || self.banned_keys.contains(auth_key)
    }

    fn whitelist_enabled(&self) -> bool {
        self.whitelist_enabled.load(Ordering::SeqCst)
    }

    fn is_whitelisted(&self, auth_key: &str) -> bool {
        self.whitelist.contains(auth_key)
    }

    fn promote_prelisted(&self, username: &str, auth_key: &str) -> bool {
        let normalized = username.to_ascii_lowercase();
        if self.prelist.remove(&normalized).is_some() {
            self.whitelist.insert(auth_key.to_string());
            true
        } else {
            false
        }
    }

    fn is_authorized(&self, auth_key: &str) -> bool {
        self.authorized.contains(auth_key)
    }

    fn ban_address(&self, remote_addr: &str) {
        self.banned_addresses.insert(remote_addr.to_string());
    }

    fn ban_key(&self, auth_key: &str) {
        self.banned_keys.insert(auth_key.to_string());
    }

    fn unban_address(&self, remote_addr: &str) {
        self.banned_addresses.remove(remote_addr);
    }

    fn unban_key(&self, auth_key: &str) {
        self.banned_keys.remove(auth_key);
    }

    fn set_whitelist_enabled(&self, enabled: bool) {
        self.whitelist_enabled.store(enabled, Ordering::SeqCst);
    }

    fn add_whitelisted(&self, auth_key: &str) {
        self.whitelist.insert(auth_key.to_string());
    }

    fn remove_whitelisted(&self, auth_key: &str) {
        self.whitelist.remove(auth_key);
    }

    fn add_prelisted(&self, username: &str) {
        self.prelist.insert(username.to_ascii_lowercase());
    }

    fn remove_prelisted(&self, username: &str) {
        self.prelist.remove(&username.to_ascii_lowercase());
    }

    fn authorize_key(&self, auth_key: &str) {
        self.authorized.insert(auth_key.to_string());
    }

    fn deauthorize_key(&self, auth_key: &str) {
        self.authorized.remove(auth_key);
    }
}
