//! End-to-end lobby scenarios over the in-memory subnet.
//!
//! Each test builds a `MemoryNetwork` with a host at 10.0.0.1 and a client
//! at 10.0.0.2, then drives both interfaces by calling `tick` directly.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lanlobby::prelude::*;
use lanlobby::{BeaconState, NamedSession, SearchState, SessionError, SessionState, VoiceRegistry};
use lanlobby_protocol::{HEADER_SIZE, begin_response};
use tokio::sync::mpsc::UnboundedReceiver;

// =========================================================================
// Helpers
// =========================================================================

const HOST_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
const CLIENT_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

type Lobby = LanSessionInterface<MemoryFactory>;

fn lobby_at(net: &MemoryNetwork, ip: Ipv4Addr, player: &str, caps: Capabilities) -> Lobby {
    let caps = caps.with_identity(Arc::new(StaticIdentity::single(player, player)));
    LanSessionInterface::new(net.interface(ip), LobbyConfig::default(), caps)
}

fn host_and_client() -> (MemoryNetwork, Lobby, Lobby) {
    let net = MemoryNetwork::new();
    let host = lobby_at(&net, HOST_IP, "host-0", Capabilities::none());
    let client = lobby_at(&net, CLIENT_IP, "client-0", Capabilities::none());
    (net, host, client)
}

fn lan_settings(public: u32) -> SessionSettings {
    SessionSettings {
        num_public_connections: public,
        should_advertise: true,
        is_lan_match: true,
        ..Default::default()
    }
}

fn routed_settings(public: u32) -> SessionSettings {
    SessionSettings {
        num_public_connections: public,
        should_advertise: true,
        allow_join_via_presence: true,
        ..Default::default()
    }
}

fn drain(rx: &mut UnboundedReceiver<LobbyEvent>) -> Vec<LobbyEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn pid(n: u32) -> UniqueNetId {
    UniqueNetId::new(format!("player-{n}"))
}

/// Lets the host answer, the client read, then runs the client's timeout out.
fn run_search_to_completion(host: &Lobby, client: &Lobby) {
    host.tick(Duration::from_millis(1));
    client.tick(Duration::from_millis(1));
    client.tick(Duration::from_secs(10));
}

#[derive(Default)]
struct RecordingVoice {
    calls: Mutex<Vec<String>>,
}

impl RecordingVoice {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl VoiceRegistry for RecordingVoice {
    fn register_local_talker(&self, local_player: usize) {
        self.calls.lock().unwrap().push(format!("local:{local_player}"));
    }
    fn register_remote_talker(&self, player: &UniqueNetId) {
        self.calls.lock().unwrap().push(format!("remote:{player}"));
    }
    fn unregister_remote_talker(&self, player: &UniqueNetId) {
        self.calls.lock().unwrap().push(format!("unremote:{player}"));
    }
    fn process_mute_change_notification(&self) {
        self.calls.lock().unwrap().push("mute".into());
    }
}

// =========================================================================
// Session lifecycle
// =========================================================================

#[test]
fn test_create_lan_session_is_pending_and_hosting() {
    let (_net, host, _client) = host_and_client();
    let (_id, mut rx) = host.events().subscribe_channel();

    host.create_session(0, "Match1", lan_settings(4)).unwrap();

    let session = host.named_session("Match1").unwrap();
    assert_eq!(session.state(), SessionState::Pending);
    assert_eq!(session.num_open_public_connections(), 4);
    assert_eq!(session.host_addr, Some(SocketAddrV4::new(HOST_IP, 7777)));
    assert_eq!(host.beacon_state(), BeaconState::Hosting);
    assert_eq!(host.resolved_connect_string("Match1").as_deref(), Some("10.0.0.1:7777"));
    assert_eq!(
        drain(&mut rx),
        vec![LobbyEvent::CreateSessionComplete {
            session: "Match1".into(),
            success: true
        }]
    );
}

#[test]
fn test_create_duplicate_name_fails_and_reports() {
    let (_net, host, _client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(4)).unwrap();
    let (_id, mut rx) = host.events().subscribe_channel();

    let err = host.create_session(0, "Match1", lan_settings(2)).unwrap_err();

    assert!(matches!(err, LobbyError::Session(SessionError::AlreadyExists(_))));
    assert_eq!(host.num_sessions(), 1);
    assert_eq!(
        drain(&mut rx),
        vec![LobbyEvent::CreateSessionComplete {
            session: "Match1".into(),
            success: false
        }]
    );
}

#[test]
fn test_create_rolls_back_when_beacon_cannot_bind() {
    let (net, host, _client) = host_and_client();
    net.block_port(14001);

    let err = host.create_session(0, "Match1", lan_settings(4)).unwrap_err();

    assert!(matches!(err, LobbyError::Beacon(_)));
    assert_eq!(host.num_sessions(), 0);
    assert_eq!(host.beacon_state(), BeaconState::NotUsingLanBeacon);
}

#[test]
fn test_create_unadvertised_session_leaves_beacon_idle() {
    let (_net, host, _client) = host_and_client();
    let mut settings = lan_settings(4);
    settings.should_advertise = false;

    host.create_session(0, "Private", settings).unwrap();

    assert_eq!(host.beacon_state(), BeaconState::NotUsingLanBeacon);
    // LAN matches still count as joinable.
    assert!(host.is_session_joinable("Private"));
}

#[test]
fn test_start_and_end_toggle_advertising() {
    let (_net, host, _client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(4)).unwrap();

    host.start_session("Match1").unwrap();
    assert_eq!(host.session_state("Match1"), Some(SessionState::InProgress));
    assert_eq!(host.beacon_state(), BeaconState::NotUsingLanBeacon);

    host.end_session("Match1").unwrap();
    assert_eq!(host.session_state("Match1"), Some(SessionState::Ended));
    assert_eq!(host.beacon_state(), BeaconState::Hosting);

    // Ended sessions can be started again.
    host.start_session("Match1").unwrap();
    assert_eq!(host.session_state("Match1"), Some(SessionState::InProgress));
}

#[test]
fn test_start_twice_reports_state_conflict_without_mutation() {
    let (_net, host, _client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(4)).unwrap();
    host.start_session("Match1").unwrap();
    let (_id, mut rx) = host.events().subscribe_channel();

    let err = host.start_session("Match1").unwrap_err();

    assert!(matches!(err, LobbyError::Session(SessionError::InvalidState { .. })));
    assert_eq!(host.session_state("Match1"), Some(SessionState::InProgress));
    assert_eq!(
        drain(&mut rx),
        vec![LobbyEvent::StartSessionComplete {
            session: "Match1".into(),
            success: false
        }]
    );
}

#[test]
fn test_end_pending_session_fails() {
    let (_net, host, _client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(4)).unwrap();
    assert!(host.end_session("Match1").is_err());
    assert_eq!(host.session_state("Match1"), Some(SessionState::Pending));
}

#[test]
fn test_destroy_twice_second_reports_not_found() {
    let (_net, host, _client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(4)).unwrap();
    host.create_session(0, "Other", lan_settings(4)).unwrap();

    host.destroy_session("Match1").unwrap();
    let err = host.destroy_session("Match1").unwrap_err();

    assert!(matches!(err, LobbyError::Session(SessionError::NotFound(_))));
    assert_eq!(host.num_sessions(), 1);
    // "Other" still needs the beacon.
    assert_eq!(host.beacon_state(), BeaconState::Hosting);

    host.destroy_session("Other").unwrap();
    assert_eq!(host.beacon_state(), BeaconState::NotUsingLanBeacon);
}

#[test]
fn test_update_unknown_session_still_reports_success() {
    let (_net, host, _client) = host_and_client();
    let (_id, mut rx) = host.events().subscribe_channel();

    assert!(host.update_session("Ghost", lan_settings(2)).is_ok());
    assert_eq!(
        drain(&mut rx),
        vec![LobbyEvent::UpdateSessionComplete {
            session: "Ghost".into(),
            success: true
        }]
    );
}

#[test]
fn test_update_can_turn_advertising_off() {
    let (_net, host, _client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(4)).unwrap();

    let mut settings = lan_settings(4);
    settings.should_advertise = false;
    host.update_session("Match1", settings.clone()).unwrap();

    assert_eq!(host.session_settings("Match1"), Some(settings));
    assert_eq!(host.beacon_state(), BeaconState::NotUsingLanBeacon);
}

// =========================================================================
// Players and voice
// =========================================================================

#[test]
fn test_register_and_unregister_restore_slot_counts() {
    let (_net, host, _client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(3)).unwrap();
    let players: Vec<_> = (1..=3).map(pid).collect();

    host.register_players("Match1", &players, false).unwrap();
    let session = host.named_session("Match1").unwrap();
    assert_eq!(session.num_open_public_connections(), 0);
    assert!(host.is_player_in_session("Match1", &pid(2)));
    assert!(!host.is_session_joinable("Match1"));

    host.unregister_players("Match1", &players).unwrap();
    assert_eq!(
        host.named_session("Match1")
            .as_ref()
            .map(NamedSession::num_open_public_connections),
        Some(3)
    );
}

#[test]
fn test_register_players_on_missing_session_fails() {
    let (_net, host, _client) = host_and_client();
    let (_id, mut rx) = host.events().subscribe_channel();

    assert!(host.register_player("Ghost", &pid(1), false).is_err());
    assert_eq!(
        drain(&mut rx),
        vec![LobbyEvent::RegisterPlayersComplete {
            session: "Ghost".into(),
            players: vec![pid(1)],
            success: false
        }]
    );
}

#[test]
fn test_join_in_progress_advertising_follows_open_slots() {
    let (_net, host, _client) = host_and_client();
    let mut settings = lan_settings(1);
    settings.allow_join_in_progress = true;
    host.create_session(0, "Match1", settings).unwrap();
    host.start_session("Match1").unwrap();
    assert_eq!(host.beacon_state(), BeaconState::Hosting);

    host.register_player("Match1", &pid(1), false).unwrap();
    assert_eq!(host.beacon_state(), BeaconState::NotUsingLanBeacon);

    host.unregister_player("Match1", &pid(1)).unwrap();
    assert_eq!(host.beacon_state(), BeaconState::Hosting);
}

#[test]
fn test_voice_sees_local_and_remote_players() {
    let net = MemoryNetwork::new();
    let voice = Arc::new(RecordingVoice::default());
    let host = lobby_at(
        &net,
        HOST_IP,
        "host-0",
        Capabilities::none().with_voice(voice.clone()),
    );

    host.create_session(0, "Match1", lan_settings(4)).unwrap();
    assert_eq!(
        voice.calls(),
        vec!["local:0", "local:1", "local:2", "local:3"]
    );

    host.register_players("Match1", &[UniqueNetId::new("host-0"), pid(7)], false)
        .unwrap();
    host.unregister_players("Match1", &[UniqueNetId::new("host-0"), pid(7)])
        .unwrap();

    assert_eq!(
        voice.calls()[4..],
        ["mute", "remote:player-7", "unremote:player-7"]
    );
}

#[test]
fn test_dedicated_server_registers_no_local_talkers() {
    let net = MemoryNetwork::new();
    let voice = Arc::new(RecordingVoice::default());
    let config = LobbyConfig {
        is_dedicated: true,
        ..Default::default()
    };
    let host = LanSessionInterface::new(
        net.interface(HOST_IP),
        config,
        Capabilities::none().with_voice(voice.clone()),
    );

    host.create_session(0, "Match1", lan_settings(4)).unwrap();

    assert!(voice.calls().is_empty());
    // No identity at all, but dedicated servers host everything.
    assert_eq!(host.beacon_state(), BeaconState::Hosting);
}

// =========================================================================
// Search
// =========================================================================

#[test]
fn test_lan_search_finds_hosted_session() {
    let (_net, host, client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(4)).unwrap();
    let (_id, mut rx) = client.events().subscribe_channel();

    client.find_sessions(SearchSettings::lan()).unwrap();
    assert_eq!(client.search_state(), SearchState::InProgress);
    run_search_to_completion(&host, &client);

    assert_eq!(drain(&mut rx), vec![LobbyEvent::FindSessionsComplete { success: true }]);
    assert_eq!(client.search_state(), SearchState::Done);
    assert_eq!(client.beacon_state(), BeaconState::NotUsingLanBeacon);

    let results = client.search_results();
    assert_eq!(results.len(), 1);
    let found = &results[0].session;
    assert_eq!(found.owning_user_id, UniqueNetId::new("host-0"));
    assert_eq!(found.num_open_public_connections, 4);
    assert_eq!(found.host_addr, Some(SocketAddrV4::new(HOST_IP, 7777)));
    assert_eq!(found.session_id, host.named_session("Match1").unwrap().session_id);
    assert_eq!(
        client.search_result_connect_string(&results[0]).as_deref(),
        Some("10.0.0.1:7777")
    );
}

#[test]
fn test_lan_search_ping_is_time_since_search_start() {
    let (_net, host, client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(4)).unwrap();

    client.find_sessions(SearchSettings::lan()).unwrap();
    std::thread::sleep(Duration::from_millis(60));
    run_search_to_completion(&host, &client);

    let results = client.search_results();
    assert_eq!(results.len(), 1);
    let ping_ms = results[0].ping_ms;
    assert!((60..2_000).contains(&ping_ms), "ping_ms = {ping_ms}");
}

#[test]
fn test_lan_search_skips_in_progress_session_without_join_in_progress() {
    let (_net, host, client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(4)).unwrap();
    host.start_session("Match1").unwrap();

    client.find_sessions(SearchSettings::lan()).unwrap();
    run_search_to_completion(&host, &client);

    assert!(client.search_results().is_empty());
    assert_eq!(client.search_state(), SearchState::Done);
}

#[test]
fn test_lan_search_finds_in_progress_session_with_join_in_progress() {
    let (_net, host, client) = host_and_client();
    let mut settings = lan_settings(4);
    settings.allow_join_in_progress = true;
    host.create_session(0, "Match1", settings).unwrap();
    host.start_session("Match1").unwrap();

    client.find_sessions(SearchSettings::lan()).unwrap();
    run_search_to_completion(&host, &client);

    assert_eq!(client.search_results().len(), 1);
}

#[test]
fn test_second_find_while_pending_is_rejected_without_event() {
    let (_net, host, client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(4)).unwrap();
    let (_id, mut rx) = client.events().subscribe_channel();

    client.find_sessions(SearchSettings::lan()).unwrap();
    let first_nonce = client.current_search().unwrap().nonce();
    let err = client.find_sessions(SearchSettings::lan()).unwrap_err();

    assert!(matches!(err, LobbyError::SearchAlreadyPending));
    assert!(drain(&mut rx).is_empty());
    assert_eq!(client.current_search().unwrap().nonce(), first_nonce);

    run_search_to_completion(&host, &client);
    assert_eq!(drain(&mut rx), vec![LobbyEvent::FindSessionsComplete { success: true }]);
    assert_eq!(client.search_results().len(), 1);
}

#[test]
fn test_find_with_failing_send_completes_as_failed() {
    let (net, _host, client) = host_and_client();
    let (_id, mut rx) = client.events().subscribe_channel();
    net.fail_sends(true);

    assert!(client.find_sessions(SearchSettings::lan()).is_err());

    assert_eq!(drain(&mut rx), vec![LobbyEvent::FindSessionsComplete { success: false }]);
    assert_eq!(client.search_state(), SearchState::Failed);
    assert_eq!(client.beacon_state(), BeaconState::NotUsingLanBeacon);

    // A failed start leaves no search pending.
    net.fail_sends(false);
    assert!(client.find_sessions(SearchSettings::lan()).is_ok());
}

#[test]
fn test_routed_find_without_target_fails() {
    let (_net, _host, client) = host_and_client();
    let mut settings = SearchSettings::lan();
    settings.is_lan_query = false;
    let err = client.find_sessions(settings).unwrap_err();
    assert!(matches!(err, LobbyError::MissingSearchTarget));
    assert_eq!(client.search_state(), SearchState::Failed);
}

#[test]
fn test_cancel_reports_success_but_records_failed() {
    let (_net, _host, client) = host_and_client();
    let (_id, mut rx) = client.events().subscribe_channel();
    client.find_sessions(SearchSettings::lan()).unwrap();

    client.cancel_find_sessions().unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![LobbyEvent::CancelFindSessionsComplete { success: true }]
    );
    assert_eq!(client.search_state(), SearchState::Failed);
    assert_eq!(client.beacon_state(), BeaconState::NotUsingLanBeacon);

    // Late ticks don't resurrect it.
    client.tick(Duration::from_secs(10));
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn test_cancel_without_search_errors_but_reports_success() {
    let (_net, _host, client) = host_and_client();
    let (_id, mut rx) = client.events().subscribe_channel();

    let err = client.cancel_find_sessions().unwrap_err();

    assert!(matches!(err, LobbyError::NoSearchInProgress));
    assert_eq!(
        drain(&mut rx),
        vec![LobbyEvent::CancelFindSessionsComplete { success: true }]
    );
    assert_eq!(client.search_state(), SearchState::NotStarted);
}

#[test]
fn test_search_pauses_hosting_and_resumes_after() {
    let (_net, host, _client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(4)).unwrap();

    host.find_sessions(SearchSettings::lan()).unwrap();
    assert_eq!(host.beacon_state(), BeaconState::Searching);

    // Creating another session mid-search must not steal the beacon.
    host.create_session(0, "Match2", lan_settings(4)).unwrap();
    assert_eq!(host.beacon_state(), BeaconState::Searching);

    host.tick(Duration::from_secs(10));
    assert_eq!(host.beacon_state(), BeaconState::Hosting);
}

#[test]
fn test_results_sorted_with_custom_comparator() {
    let net = MemoryNetwork::new();
    let host_a = lobby_at(&net, HOST_IP, "host-a", Capabilities::none());
    let host_b = lobby_at(&net, Ipv4Addr::new(10, 0, 0, 3), "host-b", Capabilities::none());
    let client = lobby_at(&net, CLIENT_IP, "client-0", Capabilities::none());
    host_a.create_session(0, "A", lan_settings(2)).unwrap();
    host_b.create_session(0, "B", lan_settings(8)).unwrap();

    let settings = SearchSettings::lan().with_sort(|a, b| {
        b.session
            .num_open_public_connections
            .cmp(&a.session.num_open_public_connections)
    });
    client.find_sessions(settings).unwrap();
    host_a.tick(Duration::from_millis(1));
    host_b.tick(Duration::from_millis(1));
    client.tick(Duration::from_millis(1));
    client.tick(Duration::from_secs(10));

    let owners: Vec<String> = client
        .search_results()
        .iter()
        .map(|r| r.session.owning_user_id.to_string())
        .collect();
    assert_eq!(owners, vec!["host-b", "host-a"]);
}

#[test]
fn test_response_with_overflowing_settings_keeps_result_with_empty_settings() {
    let (net, _host, client) = host_and_client();
    client.find_sessions(SearchSettings::lan()).unwrap();
    let nonce = client.current_search().unwrap().nonce();

    let mut packet = begin_response(&client.config().beacon.identity(), nonce, 512);
    packet
        .write_str("host-0")
        .write_str("Host")
        .write_i32(0)
        .write_i32(4)
        .write(&SocketAddrV4::new(HOST_IP, 7777))
        .write_str("session-1")
        // Settings: capacity, ten flags, build id, then a count with no entries.
        .write_i32(4)
        .write_i32(0);
    for _ in 0..10 {
        packet.write_bool(true);
    }
    packet.write_i32(0).write_i32(1000);
    let bytes = packet.finish().unwrap();
    assert!(bytes.len() > HEADER_SIZE);

    net.inject(
        SocketAddrV4::new(HOST_IP, 14001),
        SocketAddrV4::new(CLIENT_IP, 14001),
        &bytes,
    );
    client.tick(Duration::from_millis(1));
    client.tick(Duration::from_secs(10));

    let results = client.search_results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].session.session_id, "session-1");
    assert!(results[0].session.settings.settings.is_empty());
}

#[test]
fn test_response_with_stale_nonce_is_ignored() {
    let (net, _host, client) = host_and_client();
    client.find_sessions(SearchSettings::lan()).unwrap();
    let nonce = client.current_search().unwrap().nonce();

    let mut packet = begin_response(&client.config().beacon.identity(), nonce.wrapping_add(1), 512);
    packet.write(&lanlobby::SessionAdvert::default());
    net.inject(
        SocketAddrV4::new(HOST_IP, 14001),
        SocketAddrV4::new(CLIENT_IP, 14001),
        &packet.finish().unwrap(),
    );
    client.tick(Duration::from_millis(1));
    client.tick(Duration::from_secs(10));

    assert!(client.search_results().is_empty());
}

// =========================================================================
// Routed discovery
// =========================================================================

#[test]
fn test_routed_search_reaches_routed_host() {
    let (_net, host, client) = host_and_client();
    host.create_session(0, "Match1", routed_settings(4)).unwrap();
    assert_eq!(host.host_session_port(), 7778);

    client
        .find_sessions(SearchSettings::routed(SocketAddrV4::new(HOST_IP, 7778)))
        .unwrap();
    run_search_to_completion(&host, &client);

    let results = client.search_results();
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].session.host_addr,
        Some(SocketAddrV4::new(HOST_IP, 7777))
    );
}

#[test]
fn test_routed_host_uses_fallback_port_and_reports_it() {
    let (net, host, _client) = host_and_client();
    net.block_port(7778);
    let (_id, mut rx) = host.events().subscribe_channel();

    host.create_session(0, "Match1", routed_settings(4)).unwrap();

    assert_eq!(host.host_session_port(), 8000);
    assert_eq!(
        drain(&mut rx),
        vec![
            LobbyEvent::PortChanged { port: 8000 },
            LobbyEvent::CreateSessionComplete {
                session: "Match1".into(),
                success: true
            },
        ]
    );
}

#[test]
fn test_update_switches_beacon_between_lan_and_routed() {
    let (_net, host, client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(4)).unwrap();

    host.update_session("Match1", routed_settings(4)).unwrap();
    assert_eq!(host.beacon_state(), BeaconState::Hosting);
    assert_eq!(host.host_session_port(), 7778);

    client
        .find_sessions(SearchSettings::routed(SocketAddrV4::new(HOST_IP, 7778)))
        .unwrap();
    run_search_to_completion(&host, &client);
    assert_eq!(client.search_results().len(), 1);

    // And back: a LAN search finds it on the announce port again.
    host.update_session("Match1", lan_settings(4)).unwrap();
    client.find_sessions(SearchSettings::lan()).unwrap();
    run_search_to_completion(&host, &client);
    assert_eq!(client.search_results().len(), 1);
}

// =========================================================================
// Join
// =========================================================================

#[test]
fn test_join_found_session_creates_pending_non_advertising_copy() {
    let (_net, host, client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(4)).unwrap();
    client.find_sessions(SearchSettings::lan()).unwrap();
    run_search_to_completion(&host, &client);
    let result = client.search_results().remove(0);
    let (_id, mut rx) = client.events().subscribe_channel();

    client.join_session(0, "Game", &result).unwrap();

    let joined = client.named_session("Game").unwrap();
    assert_eq!(joined.state(), SessionState::Pending);
    assert_eq!(joined.session_id, result.session.session_id);
    assert!(!joined.settings.should_advertise);
    assert_eq!(client.resolved_connect_string("Game").as_deref(), Some("10.0.0.1:7777"));
    assert_eq!(client.beacon_state(), BeaconState::NotUsingLanBeacon);

    assert!(client.join_session(0, "Game", &result).is_err());
    assert_eq!(
        drain(&mut rx),
        vec![
            LobbyEvent::JoinSessionComplete {
                session: "Game".into(),
                result: JoinResult::Success
            },
            LobbyEvent::JoinSessionComplete {
                session: "Game".into(),
                result: JoinResult::AlreadyInSession
            },
        ]
    );
}

#[test]
fn test_join_result_without_address_is_unknown_error() {
    let (_net, _host, client) = host_and_client();
    let (_id, mut rx) = client.events().subscribe_channel();
    let result = SearchResult {
        session: Default::default(),
        ping_ms: 0,
    };

    assert!(matches!(
        client.join_session(0, "Game", &result),
        Err(LobbyError::NoHostAddress(_))
    ));
    assert_eq!(client.num_sessions(), 0);
    assert_eq!(
        drain(&mut rx),
        vec![LobbyEvent::JoinSessionComplete {
            session: "Game".into(),
            result: JoinResult::UnknownError
        }]
    );
}

#[test]
fn test_subscriber_can_join_from_find_complete_callback() {
    let (_net, host, client) = host_and_client();
    host.create_session(0, "Match1", lan_settings(4)).unwrap();
    let client = Arc::new(client);

    let inner = Arc::clone(&client);
    client.events().subscribe(move |event| {
        if let LobbyEvent::FindSessionsComplete { success: true } = event {
            if let Some(result) = inner.search_results().first() {
                inner.join_session(0, "Game", result).unwrap();
            }
        }
    });

    client.find_sessions(SearchSettings::lan()).unwrap();
    run_search_to_completion(&host, &client);

    assert_eq!(client.session_state("Game"), Some(SessionState::Pending));
}

// =========================================================================
// Poll loop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_poll_loop_completes_search_after_timeout() {
    let (_net, _host, client) = host_and_client();
    let client = Arc::new(client);
    let (_id, mut rx) = client.events().subscribe_channel();
    let poller = spawn_poll_loop(Arc::clone(&client), PollConfig::default());

    client.find_sessions(SearchSettings::lan()).unwrap();
    let event = tokio::time::timeout(Duration::from_secs(30), rx.recv())
        .await
        .expect("search should time out")
        .unwrap();

    assert_eq!(event, LobbyEvent::FindSessionsComplete { success: true });
    assert_eq!(client.search_state(), SearchState::Done);
    poller.shutdown().await;
}
