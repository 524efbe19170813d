//! Configuration: server behavior, logging, and the gameplay settings
//! pushed to clients. Loaded from a JSON file with environment overrides
//! and sensible defaults.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    /// Initial gameplay settings, pushed to every client at login and on
    /// change.
    pub settings: ServerSettings,
}

/// Server behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port handed to the transport's `start_listening`.
    pub port: u16,
    /// Per-client outbox queue depth before enqueues block.
    pub outbox_capacity: usize,
    /// Maximum length of a chat message the server itself broadcasts.
    pub max_chat_message_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 26950,
            outbox_capacity: 256,
            max_chat_message_length: 256,
        }
    }
}

/// Gameplay settings replicated to clients. The relay core only interprets
/// the two map-icon fields; the rest ride along opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub always_show_map_icons: bool,
    pub only_broadcast_map_icon_with_wayward_compass: bool,
    pub is_pvp_enabled: bool,
    pub is_body_damage_enabled: bool,
    pub display_names: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            always_show_map_icons: false,
            only_broadcast_map_icon_with_wayward_compass: true,
            is_pvp_enabled: false,
            is_body_damage_enabled: true,
            display_names: true,
        }
    }
}

impl ServerSettings {
    /// Whether map positions may be fanned out for a player that has a map
    /// icon.
    pub fn map_broadcast_enabled(&self) -> bool {
        self.always_show_map_icons || self.only_broadcast_map_icon_with_wayward_compass
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration: console plus an optional rolling file appender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level directive; when absent, `RUST_LOG` is consulted, then "info".
    pub level: Option<String>,
    pub format: LogFormat,
    pub enable_file_logging: bool,
    pub dir: String,
    pub filename: String,
    /// "daily", "hourly" or "never".
    pub rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: LogFormat::Text,
            enable_file_logging: false,
            dir: "logs".to_string(),
            filename: "scene-relay-server.log".to_string(),
            rotation: "daily".to_string(),
        }
    }
}

/// Load configuration from a JSON file, falling back to defaults when no
/// path is given. `SRS_PORT` overrides the configured port.
pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Ok(port) = std::env::var("SRS_PORT") {
        config.server.port = port
            .parse()
            .with_context(|| format!("invalid SRS_PORT value `{port}`"))?;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.server.port, 26950);
        assert!(config.server.outbox_capacity > 0);
        assert!(!config.settings.always_show_map_icons);
        assert!(config.settings.only_broadcast_map_icon_with_wayward_compass);
    }

    #[test]
    fn settings_equality_is_value_based() {
        let a = ServerSettings::default();
        let mut b = ServerSettings::default();
        assert_eq!(a, b);
        b.is_pvp_enabled = true;
        assert_ne!(a, b);
    }

    #[test]
    fn map_broadcast_gate_follows_either_flag() {
        let mut settings = ServerSettings {
            always_show_map_icons: false,
            only_broadcast_map_icon_with_wayward_compass: false,
            ..ServerSettings::default()
        };
        assert!(!settings.map_broadcast_enabled());
        settings.always_show_map_icons = true;
        assert!(settings.map_broadcast_enabled());
        settings.always_show_map_icons = false;
        settings.only_broadcast_map_icon_with_wayward_compass = true;
        assert!(settings.map_broadcast_enabled());
    }

    #[test]
    fn load_reads_partial_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": {{"port": 4040}}, "settings": {{"always_show_map_icons": true}}}}"#
        )
        .unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 4040);
        assert!(config.settings.always_show_map_icons);
        // Unspecified sections keep their defaults
        assert_eq!(config.server.max_chat_message_length, 256);
    }
}
