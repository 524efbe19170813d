//! Admission control, chat routing, settings replication and the admin
//! surface.


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use scene_relay_server::access::AccessLists;
use scene_relay_server::addons::{AddonRegistry, NetworkedAddon};
use scene_relay_server::command::{CommandBus, CommandSender, NullCommandBus};
use scene_relay_server::config::ServerSettings;
use scene_relay_server::protocol::{
    AddonIdentity, ClientUpdate, DisconnectReason, LoginRequest, LoginStatus, ServerUpdate, Team,
    Vec2,
};
use scene_relay_server::server::ServerApiError;
use test_helpers::*;

#[tokio::test]
async fn username_collision_is_rejected_case_insensitively() {
    let ts = build_server();
    let _alice = connect(&ts, 7, "Alice", "Town", Vec2::default(), false, 0).await;

    let (_client, response) = login(&ts, 8, "alice").await;
    assert_eq!(response.status, LoginStatus::InvalidUsername);
    assert_eq!(ts.server.player_count(), 1);
}

#[tokio::test]
async fn banned_address_is_rejected_before_anything_else() {
    let ts = build_server();
    ts.access.ban_address(&remote_addr(5));

    // Even an invalid username reports Banned: first failure wins
    let rx = ts.transport.register_client(5).unwrap();
    let response = ts
        .server
        .handle_login_request(
            5,
            &remote_addr(5),
            LoginRequest {
                username: "bad name!".to_string(),
                auth_key: auth_key(5),
                addons: Vec::new(),
            },
        )
        .await;
    assert_eq!(response.status, LoginStatus::Banned);
    drop(rx);
}

#[tokio::test]
async fn whitelist_blocks_unknown_keys_and_promotes_prelisted_names() {
    let ts = build_server();
    ts.access.set_whitelist_enabled(true);
    ts.access.add_prelisted("Alice");

    // Unknown key, unlisted name: rejected
    let (_bob, response) = login(&ts, 2, "Bob").await;
    assert_eq!(response.status, LoginStatus::NotWhiteListed);

    // Pre-listed name: admitted, key promoted into the whitelist
    let (_alice, response) = login(&ts, 1, "Alice").await;
    assert!(response.status.is_success());
    assert!(ts.access.is_whitelisted(&auth_key(1)));

    // The promotion was single-use but the key now passes directly
    ts.server.handle_client_disconnect(1).await;
    let rx = ts.transport.register_client(3).unwrap();
    let response = ts
        .server
        .handle_login_request(
            3,
            &remote_addr(3),
            LoginRequest {
                username: "Alice".to_string(),
                auth_key: auth_key(1),
                addons: Vec::new(),
            },
        )
        .await;
    assert!(response.status.is_success());
    drop(rx);
}

#[tokio::test]
async fn addon_mismatch_echoes_the_server_set() {
    let registry = AddonRegistry::new(vec![NetworkedAddon {
        identifier: "CombatSync".to_string(),
        version: "1.2.0".to_string(),
        network_id: Some(3),
    }]);
    let ts = build_server_with(
        ServerSettings::default(),
        registry,
        Arc::new(NullCommandBus),
    );

    let (_client, response) = login(&ts, 1, "Alice").await;
    assert_eq!(response.status, LoginStatus::InvalidAddons);
    assert_eq!(response.addons.len(), 1);
    assert_eq!(response.addons[0].identifier, "CombatSync");

    // Matching set succeeds and carries the addon order
    let rx = ts.transport.register_client(2).unwrap();
    let response = ts
        .server
        .handle_login_request(
            2,
            &remote_addr(2),
            LoginRequest {
                username: "Bob".to_string(),
                auth_key: auth_key(2),
                addons: vec![AddonIdentity {
                    identifier: "CombatSync".to_string(),
                    version: "1.2.0".to_string(),
                }],
            },
        )
        .await;
    assert!(response.status.is_success());
    assert_eq!(response.addon_order, vec![3]);
    drop(rx);
}

#[tokio::test]
async fn chat_broadcast_reaches_everyone_including_the_sender() {
    let ts = build_server();
    let mut alice = connect(&ts, 1, "Alice", "Town", Vec2::default(), false, 0).await;
    let mut carol = connect(&ts, 3, "Carol", "Forest", Vec2::default(), false, 0).await;
    alice.drain();

    ts.server
        .handle_update(
            1,
            ClientUpdate::ChatMessage {
                message: "hello there".to_string(),
            },
        )
        .await;

    for client in [&mut alice, &mut carol] {
        let updates = client.drain();
        match find_update(&updates, |u| matches!(u, ServerUpdate::ChatMessage { .. })) {
            Some(ServerUpdate::ChatMessage { message }) => {
                assert_eq!(message, "[Alice]: hello there");
            }
            other => panic!("expected ChatMessage, got {other:?}"),
        }
    }
}

struct SlashCommandBus {
    saw_authorized: AtomicBool,
}

#[async_trait]
impl CommandBus for SlashCommandBus {
    async fn dispatch(&self, sender: &CommandSender, message: &str) -> bool {
        if !message.starts_with('/') {
            return false;
        }
        self.saw_authorized
            .store(sender.is_authorized, Ordering::SeqCst);
        sender.reply("line one\nline two").await;
        true
    }
}

#[tokio::test]
async fn commands_are_consumed_and_replies_split_on_newline() {
    let bus = Arc::new(SlashCommandBus {
        saw_authorized: AtomicBool::new(false),
    });
    let ts = build_server_with(
        ServerSettings::default(),
        AddonRegistry::default(),
        bus.clone(),
    );
    ts.access.authorize_key(&auth_key(1));

    let mut alice = connect(&ts, 1, "Alice", "Town", Vec2::default(), false, 0).await;
    let mut bob = connect(&ts, 2, "Bob", "Town", Vec2::default(), false, 0).await;
    alice.drain();

    ts.server
        .handle_update(
            1,
            ClientUpdate::ChatMessage {
                message: "/list".to_string(),
            },
        )
        .await;

    assert!(bus.saw_authorized.load(Ordering::SeqCst));

    // The sender gets the two reply lines; nobody gets a broadcast
    let replies: Vec<String> = alice
        .drain()
        .iter()
        .filter_map(|u| match &**u {
            ServerUpdate::ChatMessage { message } => Some(message.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(replies, vec!["line one".to_string(), "line two".to_string()]);
    assert!(bob.drain().is_empty());
}

#[tokio::test]
async fn cancelled_chat_events_suppress_the_broadcast() {
    let ts = build_server();
    let mut alice = connect(&ts, 1, "Alice", "Town", Vec2::default(), false, 0).await;
    let mut bob = connect(&ts, 2, "Bob", "Town", Vec2::default(), false, 0).await;
    alice.drain();

    let api = ts.server.api();
    api.chat_events().subscribe(|event| {
        if event.message.contains("secret") {
            event.cancel();
        }
        Ok(())
    });

    ts.server
        .handle_update(
            1,
            ClientUpdate::ChatMessage {
                message: "the secret word".to_string(),
            },
        )
        .await;
    assert!(bob.drain().is_empty());

    ts.server
        .handle_update(
            1,
            ClientUpdate::ChatMessage {
                message: "plain talk".to_string(),
            },
        )
        .await;
    assert_eq!(bob.drain_count(), 1);
}

#[tokio::test]
async fn oversized_broadcast_is_an_argument_error() {
    let ts = build_server();
    let mut alice = connect(&ts, 1, "Alice", "Town", Vec2::default(), false, 0).await;

    let oversized = "x".repeat(10_000);
    match ts.server.broadcast_chat_message(&oversized).await {
        Err(ServerApiError::MessageTooLong { .. }) => {}
        other => panic!("expected MessageTooLong, got {other:?}"),
    }
    assert!(alice.drain().is_empty());

    ts.server.broadcast_chat_message("server notice").await.unwrap();
    assert_eq!(alice.drain_count(), 1);
}

#[tokio::test]
async fn equal_settings_produce_no_fan_out() {
    let ts = build_server();
    let mut alice = connect(&ts, 1, "Alice", "Town", Vec2::default(), false, 0).await;

    let current = ts.server.current_settings().await;
    ts.server.apply_server_settings(current.clone()).await;
    assert!(alice.drain().is_empty());

    let mut changed = current;
    changed.is_pvp_enabled = !changed.is_pvp_enabled;
    ts.server.apply_server_settings(changed.clone()).await;

    let updates = alice.drain();
    match find_update(&updates, |u| matches!(u, ServerUpdate::ServerSettings(_))) {
        Some(ServerUpdate::ServerSettings(settings)) => assert_eq!(*settings, changed),
        other => panic!("expected ServerSettings, got {other:?}"),
    }
}

#[tokio::test]
async fn team_updates_are_global_and_deaths_scene_local() {
    let ts = build_server();
    let _alice = connect(&ts, 1, "Alice", "Town", Vec2::default(), false, 0).await;
    let mut bob = connect(&ts, 2, "Bob", "Town", Vec2::default(), false, 0).await;
    let mut carol = connect(&ts, 3, "Carol", "Forest", Vec2::default(), false, 0).await;
    bob.drain();

    ts.server
        .handle_update(1, ClientUpdate::PlayerTeamUpdate { team: Team::Grimm })
        .await;
    ts.server.handle_update(1, ClientUpdate::PlayerDeath).await;

    let bob_updates = bob.drain();
    assert!(find_update(&bob_updates, |u| {
        matches!(u, ServerUpdate::PlayerTeamUpdate { client_id: 1, team: Team::Grimm, .. })
    })
    .is_some());
    assert!(find_update(&bob_updates, |u| {
        matches!(u, ServerUpdate::PlayerDeath { client_id: 1 })
    })
    .is_some());

    let carol_updates = carol.drain();
    assert!(find_update(&carol_updates, |u| {
        matches!(u, ServerUpdate::PlayerTeamUpdate { client_id: 1, .. })
    })
    .is_some());
    assert!(find_update(&carol_updates, |u| {
        matches!(u, ServerUpdate::PlayerDeath { .. })
    })
    .is_none());
}

#[tokio::test]
async fn skin_updates_fan_out_only_on_change() {
    let ts = build_server();
    let _alice = connect(&ts, 1, "Alice", "Town", Vec2::default(), false, 0).await;
    let mut bob = connect(&ts, 2, "Bob", "Town", Vec2::default(), false, 0).await;

    ts.server
        .handle_update(1, ClientUpdate::PlayerSkinUpdate { skin_id: 4 })
        .await;
    assert_eq!(bob.drain_count(), 1);

    // Same skin again: nothing
    ts.server
        .handle_update(1, ClientUpdate::PlayerSkinUpdate { skin_id: 4 })
        .await;
    assert_eq!(bob.drain_count(), 0);
}

#[tokio::test]
async fn kick_sends_reason_and_removes_the_player() {
    let ts = build_server();
    let mut alice = connect(&ts, 1, "Alice", "Town", Vec2::default(), false, 0).await;
    let mut bob = connect(&ts, 2, "Bob", "Town", Vec2::default(), false, 0).await;
    alice.drain();

    ts.server.kick_player(1).await.unwrap();

    let updates = alice.drain();
    assert!(find_update(&updates, |u| {
        matches!(u, ServerUpdate::Disconnect { reason: DisconnectReason::Kicked })
    })
    .is_some());
    assert!(find_update(
        &bob.drain(),
        |u| matches!(u, ServerUpdate::PlayerDisconnect { client_id: 1, .. })
    )
    .is_some());
    assert_eq!(ts.server.player_count(), 1);

    // Kicking the departed id again is an argument error
    match ts.server.kick_player(1).await {
        Err(ServerApiError::UnknownClient(1)) => {}
        other => panic!("expected UnknownClient, got {other:?}"),
    }
}

#[tokio::test]
async fn ban_blocks_the_next_login() {
    let ts = build_server();
    let _alice = connect(&ts, 1, "Alice", "Town", Vec2::default(), false, 0).await;

    ts.server.ban_player(1).await.unwrap();
    assert_eq!(ts.server.player_count(), 0);

    // Same address: rejected as banned
    let rx = ts.transport.register_client(5).unwrap();
    let response = ts
        .server
        .handle_login_request(
            5,
            &remote_addr(1),
            LoginRequest {
                username: "AliceAgain".to_string(),
                auth_key: "fresh-key".to_string(),
                addons: Vec::new(),
            },
        )
        .await;
    assert_eq!(response.status, LoginStatus::Banned);
    drop(rx);
}

#[tokio::test]
async fn shutdown_notifies_every_client_and_clears_state() {
    let ts = build_server();
    let mut alice = connect(&ts, 1, "Alice", "Town", Vec2::default(), false, 0).await;
    let mut bob = connect(&ts, 2, "Bob", "Forest", Vec2::default(), false, 0).await;
    alice.drain();

    ts.server.start().await.unwrap();
    ts.server.shutdown().await.unwrap();

    for client in [&mut alice, &mut bob] {
        let updates = client.drain();
        assert!(find_update(&updates, |u| {
            matches!(u, ServerUpdate::Disconnect { reason: DisconnectReason::Shutdown })
        })
        .is_some());
    }
    assert_eq!(ts.server.player_count(), 0);
    assert!(!ts.server.is_started());
}

#[tokio::test]
async fn list_players_reports_active_records_with_scenes() {
    let ts = build_server();
    let _alice = connect(&ts, 1, "Alice", "Town", Vec2::default(), false, 0).await;
    let _bob = connect(&ts, 2, "Bob", "Forest", Vec2::default(), false, 0).await;
    // Logged in but no hello yet: invisible
    let (_carol, response) = login(&ts, 3, "Carol").await;
    assert!(response.status.is_success());

    let mut players = ts.server.list_players();
    players.sort_by_key(|entry| entry.id);
    assert_eq!(players.len(), 2);
    assert_eq!(players[0].username, "Alice");
    assert_eq!(players[0].scene, "Town");
    assert_eq!(players[1].scene, "Forest");
}
