//! Registry of the server's networked addons, used during admission to
//! verify that a client runs an identical addon set.

use serde::{Deserialize, Serialize};

use crate::protocol::AddonIdentity;

/// A networked addon loaded on the server. Addons that exchange their own
/// packets carry a numeric network id; purely cosmetic addons do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkedAddon {
    pub identifier: String,
    pub version: String,
    pub network_id: Option<u8>,
}

impl NetworkedAddon {
    pub fn identity(&self) -> AddonIdentity {
        AddonIdentity {
            identifier: self.identifier.clone(),
            version: self.version.clone(),
        }
    }
}

/// The server's networked addon set. Admission requires the client set to
/// have the same cardinality and an exact (identifier, version) match for
/// every entry.
#[derive(Debug, Clone, Default)]
pub struct AddonRegistry {
    addons: Vec<NetworkedAddon>,
}

impl AddonRegistry {
    pub fn new(addons: Vec<NetworkedAddon>) -> Self {
        Self { addons }
    }

    pub fn is_empty(&self) -> bool {
        self.addons.is_empty()
    }

    /// The full networked addon set, as echoed on an `InvalidAddons`
    /// rejection.
    pub fn identities(&self) -> Vec<AddonIdentity> {
        self.addons.iter().map(NetworkedAddon::identity).collect()
    }

    /// Whether a client's addon set matches exactly.
    pub fn matches(&self, client_addons: &[AddonIdentity]) -> bool {
        client_addons.len() == self.addons.len()
            && client_addons.iter().all(|client| {
                self.addons.iter().any(|server| {
                    server.identifier == client.identifier && server.version == client.version
                })
            })
    }

    /// Server-side numeric ids in the order the client presented the
    /// addons, skipping addons the server does not number.
    pub fn addon_order(&self, client_addons: &[AddonIdentity]) -> Vec<u8> {
        client_addons
            .iter()
            .filter_map(|client| {
                self.addons
                    .iter()
                    .find(|server| {
                        server.identifier == client.identifier && server.version == client.version
                    })
                    .and_then(|server| server.network_id)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AddonRegistry {
        AddonRegistry::new(vec![
            NetworkedAddon {
                identifier: "CombatSync".to_string(),
                version: "1.2.0".to_string(),
                network_id: Some(3),
            },
            NetworkedAddon {
                identifier: "EmoteWheel".to_string(),
                version: "0.9.1".to_string(),
                network_id: None,
            },
            NetworkedAddon {
                identifier: "BossRush".to_string(),
                version: "2.0.0".to_string(),
                network_id: Some(7),
            },
        ])
    }

    fn identity(identifier: &str, version: &str) -> AddonIdentity {
        AddonIdentity {
            identifier: identifier.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn matching_requires_equal_cardinality() {
        let registry = registry();
        let partial = vec![identity("CombatSync", "1.2.0")];
        assert!(!registry.matches(&partial));
    }

    #[test]
    fn matching_requires_exact_versions() {
        let registry = registry();
        let mismatched = vec![
            identity("CombatSync", "1.2.1"),
            identity("EmoteWheel", "0.9.1"),
            identity("BossRush", "2.0.0"),
        ];
        assert!(!registry.matches(&mismatched));

        let exact = vec![
            identity("BossRush", "2.0.0"),
            identity("CombatSync", "1.2.0"),
            identity("EmoteWheel", "0.9.1"),
        ];
        assert!(registry.matches(&exact));
    }

    #[test]
    fn addon_order_follows_client_order_and_skips_unnumbered() {
        let registry = registry();
        let client = vec![
            identity("BossRush", "2.0.0"),
            identity("EmoteWheel", "0.9.1"),
            identity("CombatSync", "1.2.0"),
        ];
        assert_eq!(registry.addon_order(&client), vec![7, 3]);
    }

    #[test]
    fn empty_registry_matches_empty_client_set() {
        let registry = AddonRegistry::default();
        assert!(registry.matches(&[]));
        assert!(!registry.matches(&[identity("CombatSync", "1.2.0")]));
    }
}
