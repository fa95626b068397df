//! Integration tests for the multiplayer game session
//!
//! A fake server drives the raw side of an in-memory connection while the
//! session runs against the other side, with short real timers.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use glam::{DQuat, DVec3};
use seaward_client::{
    ClientConfig, Endpoint, GameSession, MatchmakerDiscovery, MemoryConnector, SessionEvent,
    StaticDiscovery, TimerKind,
};
use seaward_protocol::{
    events, ConnectionState, EntityState, Envelope, InitializationFrame, Intent, KindDelta,
    MenuOption, PlayerRecord, PlayersUpdate, ServerMessage, ShardPort, SimulationEvent, SoundEvent,
    SoundType, SyncFrame,
};
use seaward_simulation::{PlaybackHandle, SoundPlayer};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

// ============================================================================
// Helpers
// ============================================================================

struct FakeServer {
    to_client: mpsc::Sender<Envelope>,
    from_client: mpsc::Receiver<Envelope>,
}

impl FakeServer {
    fn accept(connector: &MemoryConnector) -> Self {
        let (to_client, from_client) = connector.accept_next(64).into_parts();
        Self {
            to_client,
            from_client,
        }
    }

    async fn send(&self, message: ServerMessage) {
        self.send_raw(message.to_envelope().unwrap()).await;
    }

    async fn send_raw(&self, envelope: Envelope) {
        self.to_client.send(envelope).await.unwrap();
    }

    async fn expect(&mut self) -> Envelope {
        timeout(Duration::from_secs(1), self.from_client.recv())
            .await
            .expect("timed out waiting for a client message")
            .expect("client closed the connection")
    }

    async fn expect_event(&mut self, event: &str) -> Envelope {
        let envelope = self.expect().await;
        assert_eq!(envelope.event, event);
        envelope
    }

    async fn expect_silence(&mut self, wait: Duration) {
        if let Ok(Some(envelope)) = timeout(wait, self.from_client.recv()).await {
            panic!("unexpected client message {:?}", envelope);
        }
    }
}

fn test_config() -> ClientConfig {
    ClientConfig {
        reconnect_delay: Duration::from_millis(50),
        init_loop_delay: Duration::from_secs(30),
        ..Default::default()
    }
}

async fn pump_until<F>(session: &mut GameSession, what: &str, done: F)
where
    F: Fn(&GameSession) -> bool,
{
    let result = timeout(Duration::from_secs(2), async {
        while !done(&*session) {
            assert!(session.process_next().await, "session event channel closed");
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for {}", what);
}

async fn open_session(config: ClientConfig) -> (GameSession, FakeServer, MemoryConnector) {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    let connector = MemoryConnector::new();
    let server = FakeServer::accept(&connector);
    let mut session = GameSession::with_connector(config, Box::new(connector.clone()));

    session.start().await.unwrap();
    pump_until(&mut session, "open", |s| s.status().state == ConnectionState::Open).await;

    (session, server, connector)
}

fn world_with_ship() -> InitializationFrame {
    InitializationFrame {
        ships: vec![EntityState::new("ship-1")
            .with_pose(DQuat::from_axis_angle(DVec3::X, 0.4), DQuat::IDENTITY)
            .with_velocity(DQuat::from_axis_angle(DVec3::Y, 0.01), DQuat::IDENTITY)],
        players: vec![PlayerRecord::new("p1").controlling("ship-1")],
        player_id: Some("p1".into()),
        ..Default::default()
    }
}

async fn initialize(session: &mut GameSession, server: &FakeServer) {
    server.send(ServerMessage::SendWorld(world_with_ship())).await;
    pump_until(session, "world", |s| s.world().is_initialized()).await;
}

// ============================================================================
// Connection lifecycle
// ============================================================================

#[tokio::test]
async fn test_open_requests_world_and_logs_in() {
    let config = test_config().with_player_name("Ann");
    let (_session, mut server, _connector) = open_session(config).await;

    server.expect_event(events::GET_WORLD).await;
    let join = server.expect_event(events::JOIN_GAME).await;
    assert_eq!(join.message, json!({ "name": "Ann" }));
}

#[tokio::test]
async fn test_login_after_open() {
    let (mut session, mut server, _connector) = open_session(test_config()).await;
    server.expect_event(events::GET_WORLD).await;
    server.expect_silence(Duration::from_millis(30)).await;

    session.login("Bea");

    let join = server.expect_event(events::JOIN_GAME).await;
    assert_eq!(join.message["name"], "Bea");
}

#[tokio::test]
async fn test_world_initializes_session() {
    let (mut session, mut server, _connector) = open_session(test_config()).await;
    server.expect_event(events::GET_WORLD).await;

    initialize(&mut session, &server).await;

    assert_eq!(session.status().state, ConnectionState::Initialized);
    assert_eq!(session.world().controlled_entity_id(), Some("ship-1"));
}

#[tokio::test]
async fn test_discovery_failure_is_surfaced() {
    let connector = MemoryConnector::new();
    let _server = FakeServer::accept(&connector);
    let mut session = GameSession::with_connector(test_config(), Box::new(connector.clone()))
        .with_discovery(Box::new(MatchmakerDiscovery::new("http://127.0.0.1:1/match")));

    let result = session.start().await;

    assert!(result.is_err());
    assert!(session.status().discovery_error.is_some());
    assert_eq!(session.status().state, ConnectionState::Closed);
    assert!(!session.status().reconnecting);
    // Never connected
    assert_eq!(connector.queued(), 1);
}

#[tokio::test]
async fn test_discovery_sets_endpoint() {
    let connector = MemoryConnector::new();
    let _server = FakeServer::accept(&connector);
    let mut session = GameSession::with_connector(test_config(), Box::new(connector.clone()))
        .with_discovery(Box::new(StaticDiscovery::new(Endpoint::new("10.1.2.3", 7777))));

    session.start().await.unwrap();

    let endpoint = session.transport().unwrap().endpoint();
    assert_eq!(endpoint.host, "10.1.2.3");
    assert_eq!(endpoint.port, 7777);
}

// ============================================================================
// Messages
// ============================================================================

#[tokio::test]
async fn test_frame_is_acknowledged_before_it_is_applied() {
    let (mut session, mut server, _connector) = open_session(test_config()).await;
    server.expect_event(events::GET_WORLD).await;
    initialize(&mut session, &server).await;

    // Undecodable frame: still acknowledged, never applied
    server
        .send_raw(Envelope::new(events::SEND_FRAME, json!({ "ships": "nope" })))
        .await;
    assert!(session.process_next().await);
    server.expect_event(events::ACK).await;
    assert_eq!(session.world().ships().len(), 1);

    let frame = SyncFrame {
        ships: KindDelta::new(Some(Vec::new()), Vec::new()),
        ..Default::default()
    };
    server.send(ServerMessage::SendFrame(frame)).await;
    assert!(session.process_next().await);

    let ack = server.expect_event(events::ACK).await;
    assert_eq!(ack.message, json!("ACK"));
    assert!(session.world().ships().is_empty());
}

#[tokio::test]
async fn test_malformed_messages_are_dropped() {
    let (mut session, mut server, _connector) = open_session(test_config()).await;
    server.expect_event(events::GET_WORLD).await;

    server.send_raw(Envelope::new("bogus-event", json!({}))).await;
    server
        .send_raw(Envelope::new(events::SEND_PLAYERS, json!({ "players": 3 })))
        .await;
    server
        .send(ServerMessage::SendPlayers(PlayersUpdate {
            players: vec![PlayerRecord::new("p9")],
            player_id: "p9".into(),
        }))
        .await;

    pump_until(&mut session, "players", |s| s.world().players().contains_key("p9")).await;

    assert_eq!(session.status().state, ConnectionState::Open);
    assert_eq!(session.world().binding().map(|b| b.player_id.as_str()), Some("p9"));
}

#[tokio::test]
async fn test_spawn_menus_and_events() {
    let (mut session, mut server, _connector) = open_session(test_config()).await;
    server.expect_event(events::GET_WORLD).await;

    let option = MenuOption {
        id: "red".into(),
        name: "Red Fleet".into(),
        attributes: Default::default(),
    };
    server
        .send(ServerMessage::SendSpawnFactions(vec![option.clone()]))
        .await;
    server
        .send(ServerMessage::Generic(SimulationEvent::Death {
            ship_id: "ship-9".into(),
        }))
        .await;

    pump_until(&mut session, "event", |s| !s.world().event_log().is_empty()).await;

    assert_eq!(session.status().menus.factions, vec![option]);
    assert!(session.status().menus.planets.is_empty());
}

/// Sound backend that records the one-offs it was asked to play
#[derive(Clone, Default)]
struct RecordingPlayer {
    played: Arc<Mutex<Vec<String>>>,
}

impl SoundPlayer for RecordingPlayer {
    fn is_loaded(&self, _sound_type: &SoundType) -> bool {
        true
    }

    fn play_once(&mut self, _ship_id: &str, sound_type: &SoundType) {
        self.played.lock().unwrap().push(sound_type.as_str().to_string());
    }

    fn start_loop(&mut self, _ship_id: &str, _sound_type: &SoundType) -> Option<PlaybackHandle> {
        Some(PlaybackHandle(1))
    }

    fn stop(&mut self, _handle: PlaybackHandle) {}
}

#[tokio::test]
async fn test_sound_between_frames_plays_once() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    let connector = MemoryConnector::new();
    let mut server = FakeServer::accept(&connector);
    let player = RecordingPlayer::default();
    let played = player.played.clone();
    let mut session = GameSession::with_connector(test_config(), Box::new(connector.clone()))
        .with_sound_player(Box::new(player));

    session.start().await.unwrap();
    pump_until(&mut session, "open", |s| s.status().state == ConnectionState::Open).await;
    server.expect_event(events::GET_WORLD).await;
    initialize(&mut session, &server).await;

    // The frame lands before any render tick
    server
        .send(ServerMessage::Generic(SimulationEvent::Sound(SoundEvent::one_off(
            "ship-1",
            "cannonFire",
        ))))
        .await;
    server.send(ServerMessage::SendFrame(SyncFrame::default())).await;
    assert!(session.process_next().await);
    assert!(session.process_next().await);
    session.render_tick(Instant::now());
    session.render_tick(Instant::now() + Duration::from_millis(16));

    assert_eq!(*played.lock().unwrap(), vec!["cannonFire".to_string()]);
}

#[tokio::test]
async fn test_init_loop_sent_once_after_delay() {
    let config = ClientConfig {
        init_loop_delay: Duration::from_millis(30),
        ..test_config()
    };
    let (mut session, mut server, _connector) = open_session(config).await;
    server.expect_event(events::GET_WORLD).await;

    initialize(&mut session, &server).await;
    server.expect_silence(Duration::from_millis(10)).await;

    assert!(session.process_next().await);
    server.expect_event(events::INIT_LOOP).await;

    // A second world on the same connection does not schedule another one
    server.send(ServerMessage::SendWorld(world_with_ship())).await;
    assert!(session.process_next().await);
    assert!(timeout(Duration::from_millis(100), session.next_event()).await.is_err());
}

#[tokio::test]
async fn test_render_tick_extrapolates_between_frames() {
    let (mut session, mut server, _connector) = open_session(test_config()).await;
    server.expect_event(events::GET_WORLD).await;
    initialize(&mut session, &server).await;
    let before = session.world().ships()["ship-1"].position;

    let report = session.render_tick(Instant::now() + Duration::from_millis(50));

    assert!(report.delta > 0.0);
    assert_ne!(session.world().ships()["ship-1"].position, before);
}

// ============================================================================
// Disconnects and reconnects
// ============================================================================

#[tokio::test]
async fn test_disconnect_resets_world_and_preserves_intents() {
    let config = test_config().with_player_name("Ann");
    let (mut session, mut server, connector) = open_session(config).await;
    server.expect_event(events::GET_WORLD).await;
    server.expect_event(events::JOIN_GAME).await;
    initialize(&mut session, &server).await;

    let mut next_server = FakeServer::accept(&connector);
    drop(server);
    pump_until(&mut session, "close", |s| s.status().reconnecting).await;

    assert_eq!(session.world().entity_count(), 0);
    assert!(session.world().binding().is_none());
    assert!(session.world().ghosts().contains_key("ghost:camera"));

    session.send_intent(Intent::Fire);
    assert_eq!(session.router().pending(), 1);

    pump_until(&mut session, "reconnect", |s| {
        s.status().state == ConnectionState::Open
    })
    .await;

    next_server.expect_event(events::GET_WORLD).await;
    next_server.expect_event(events::JOIN_GAME).await;
    let intent = next_server.expect_event(events::GENERIC_MESSAGE).await;
    assert_eq!(intent.message, json!({ "type": "fire" }));
    assert_eq!(session.router().pending(), 0);
}

#[tokio::test]
async fn test_failed_connect_retries_after_delay() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();
    let connector = MemoryConnector::new();
    let mut session = GameSession::with_connector(test_config(), Box::new(connector.clone()));

    session.start().await.unwrap();
    pump_until(&mut session, "failure", |s| s.status().reconnecting).await;
    assert_eq!(session.status().state, ConnectionState::Reconnecting);

    let mut server = FakeServer::accept(&connector);
    pump_until(&mut session, "open", |s| s.status().state == ConnectionState::Open).await;
    server.expect_event(events::GET_WORLD).await;
}

#[tokio::test]
async fn test_stale_events_are_ignored() {
    let (mut session, mut server, connector) = open_session(test_config()).await;
    server.expect_event(events::GET_WORLD).await;
    initialize(&mut session, &server).await;
    let stale = session.transport().unwrap().generation();

    let _next_server = FakeServer::accept(&connector);
    session.reconnect_now();
    let current = session.transport().unwrap().generation();
    assert!(current > stale);

    // A reconnect timer and a close from the old connection change nothing
    let _spare = FakeServer::accept(&connector);
    session.handle_event(SessionEvent::Timer {
        generation: stale,
        kind: TimerKind::Reconnect,
    });
    session.handle_event(SessionEvent::Closed {
        generation: stale,
        error: Some("late".into()),
    });

    assert_eq!(connector.queued(), 1);
    assert_eq!(session.transport().unwrap().generation(), current);
    assert!(!session.status().reconnecting);
    assert_eq!(session.world().ships().len(), 1);
}

#[tokio::test]
async fn test_shutdown_cancels_reconnect() {
    let (mut session, server, connector) = open_session(test_config()).await;
    drop(server);
    pump_until(&mut session, "close", |s| s.status().reconnecting).await;
    let _next_server = FakeServer::accept(&connector);

    session.shutdown();

    assert!(timeout(Duration::from_millis(150), session.next_event()).await.is_err());
    assert_eq!(connector.queued(), 1);
    assert_eq!(session.status().state, ConnectionState::Closed);
}

// ============================================================================
// Shards
// ============================================================================

#[tokio::test]
async fn test_standalone_shard_reroutes() {
    let (mut session, mut server, connector) = open_session(test_config()).await;
    server.expect_event(events::GET_WORLD).await;
    initialize(&mut session, &server).await;
    let mut shard = FakeServer::accept(&connector);

    server
        .send(ServerMessage::ShardPortNumber(ShardPort {
            port_number: 9001,
            is_standalone: true,
        }))
        .await;
    pump_until(&mut session, "shard", |s| {
        s.status().state == ConnectionState::Open
    })
    .await;

    shard.expect_event(events::GET_WORLD).await;
    assert_eq!(session.transport().unwrap().endpoint().port, 9001);
    assert!(!session.world().is_initialized());
}

#[tokio::test]
async fn test_non_standalone_shard_redirects() {
    let (mut session, mut server, connector) = open_session(test_config()).await;
    server.expect_event(events::GET_WORLD).await;
    let _unused = FakeServer::accept(&connector);

    server
        .send(ServerMessage::ShardPortNumber(ShardPort {
            port_number: 9002,
            is_standalone: false,
        }))
        .await;
    pump_until(&mut session, "redirect", |s| s.status().redirect.is_some()).await;

    assert_eq!(
        session.status().redirect.as_deref(),
        Some("ws://127.0.0.1:9002/")
    );
    assert_eq!(session.status().state, ConnectionState::Closed);
    assert!(!session.status().reconnecting);
    assert_eq!(connector.queued(), 1);
}
