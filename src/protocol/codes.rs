use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a login request, returned to the client before any other
/// traffic is exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginStatus {
    Success,
    InvalidAddons,
    NotWhiteListed,
    Banned,
    InvalidUsername,
}

impl LoginStatus {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// The disconnect reason that accompanies a rejected login, if any.
    pub fn disconnect_reason(self) -> Option<DisconnectReason> {
        match self {
            Self::Success => None,
            Self::InvalidAddons => Some(DisconnectReason::InvalidAddons),
            Self::NotWhiteListed => Some(DisconnectReason::NotWhiteListed),
            Self::Banned => Some(DisconnectReason::Banned),
            Self::InvalidUsername => Some(DisconnectReason::InvalidUsername),
        }
    }
}

/// Reason carried on the final frame before the server drops a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisconnectReason {
    Shutdown,
    Kicked,
    Banned,
    InvalidAddons,
    NotWhiteListed,
    InvalidUsername,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Shutdown => "server is shutting down",
            Self::Kicked => "kicked by the server",
            Self::Banned => "banned from this server",
            Self::InvalidAddons => "addon set does not match the server",
            Self::NotWhiteListed => "not on the whitelist",
            Self::InvalidUsername => "invalid username",
        };
        f.write_str(text)
    }
}
