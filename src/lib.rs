#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools
)]

//! # Scene Relay Server
//!
//! An in-memory relay server for scene-scoped shared world state in
//! peer-hosted action games.
//!
//! The core authenticates clients, tracks which scene each player
//! occupies, forwards state changes only to the peers that need them, and
//! designates one "scene host" per scene whose simulation is authoritative
//! for that scene's entities. The UDP transport, command parsing and addon
//! loading are external collaborators consumed through capability traits.

/// Access lists: bans, whitelist, authorized keys
pub mod access;

/// Networked addon registry used during admission
pub mod addons;

/// Chat command dispatch capability
pub mod command;

/// Server configuration and gameplay settings
pub mod config;

/// Subscriber-list event emission
pub mod events;

/// Structured logging configuration
pub mod logging;

/// Wire message and replicated state types
pub mod protocol;

/// The relay core
pub mod server;

/// Transport capability and the in-memory implementation
pub mod transport;
