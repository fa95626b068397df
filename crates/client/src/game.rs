//! Game session engine
//!
//! One [`GameSession`] per game mode. It owns the world mirror and every
//! component that touches it, and is driven by two time sources: session
//! events (network messages and timers) and render ticks.

use std::time::Instant;

use seaward_protocol::{
    events, ClientMessage, ConnectionState, Envelope, Intent, MenuOption, ServerMessage,
    ShardPort,
};
use seaward_simulation::{
    LocalSimulation, MotionStepper, Script, ScriptContext, SoundPass, SoundPlayer, SoundTracker,
    SyncApplier, TickSource, WorldMirror,
};
use tokio::sync::mpsc;

use crate::config::ClientConfig;
use crate::discovery::{Discovery, MatchmakerDiscovery};
use crate::error::ClientError;
use crate::router::{OutgoingRouter, RouteMode};
use crate::session::{SessionEvent, TimerKind, TransportSession};
use crate::transport::{Connector, WebSocketConnector};

/// Player id used when a local simulation does not bind one
const LOCAL_PLAYER_ID: &str = "local";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Multiplayer,
    SinglePlayer,
    Tutorial,
}

/// Spawn menu options offered by the server
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnMenus {
    pub factions: Vec<MenuOption>,
    pub planets: Vec<MenuOption>,
    pub locations: Vec<MenuOption>,
}

/// State flags for the UI layer
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub mode: GameMode,
    pub state: ConnectionState,

    /// A reconnect is scheduled
    pub reconnecting: bool,

    /// Set when endpoint discovery failed; the session stays closed
    pub discovery_error: Option<String>,

    /// URL of a shard the player should be sent to
    pub redirect: Option<String>,

    pub menus: SpawnMenus,

    /// Tutorial prompt
    pub prompt: Option<String>,
}

impl SessionStatus {
    fn new(mode: GameMode) -> Self {
        Self {
            mode,
            state: ConnectionState::Closed,
            reconnecting: false,
            discovery_error: None,
            redirect: None,
            menus: SpawnMenus::default(),
            prompt: None,
        }
    }
}

/// What a render tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Frames of motion applied by the stepper
    pub delta: f64,
    pub sounds: SoundPass,
}

pub struct GameSession {
    config: ClientConfig,
    mode: GameMode,
    status: SessionStatus,

    world: WorldMirror,
    applier: SyncApplier,
    stepper: MotionStepper,
    sounds: SoundTracker,
    router: OutgoingRouter,

    transport: Option<TransportSession>,
    discovery: Option<Box<dyn Discovery>>,
    events_rx: mpsc::Receiver<SessionEvent>,

    local: Option<Box<dyn LocalSimulation>>,
    last_local_step: Option<Instant>,
    script: Option<Script>,

    /// Generation whose `init-loop` is already scheduled
    init_loop_generation: Option<u64>,
}

impl GameSession {
    /// Multiplayer session over WebSocket
    pub fn multiplayer(config: ClientConfig) -> Self {
        Self::with_connector(config, Box::new(WebSocketConnector))
    }

    /// Multiplayer session over a custom connector
    pub fn with_connector(config: ClientConfig, connector: Box<dyn Connector>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.channel_capacity);
        let mut transport = TransportSession::new(
            connector,
            config.endpoint.clone(),
            events_tx,
            config.channel_capacity,
        );
        transport.auto_login = config.auto_login && config.player_name.is_some();

        let discovery: Option<Box<dyn Discovery>> = config
            .matchmaker_url
            .as_ref()
            .map(|url| Box::new(MatchmakerDiscovery::new(url.clone())) as Box<dyn Discovery>);

        let mut session = Self::base(config, GameMode::Multiplayer, events_rx);
        session.transport = Some(transport);
        session.discovery = discovery;
        session
    }

    /// Single-player session backed by an in-process simulation
    pub fn single_player(config: ClientConfig, simulation: Box<dyn LocalSimulation>) -> Self {
        let (_, events_rx) = mpsc::channel(1);
        let mut session = Self::base(config, GameMode::SinglePlayer, events_rx);
        session.local = Some(simulation);
        session
    }

    /// Tutorial: a local simulation plus a scripted sequence
    pub fn tutorial(
        config: ClientConfig,
        simulation: Box<dyn LocalSimulation>,
        script: Script,
    ) -> Self {
        let mut session = Self::single_player(config, simulation);
        session.mode = GameMode::Tutorial;
        session.status.mode = GameMode::Tutorial;
        session.script = Some(script);
        session
    }

    fn base(config: ClientConfig, mode: GameMode, events_rx: mpsc::Receiver<SessionEvent>) -> Self {
        let route_mode = match mode {
            GameMode::Multiplayer => RouteMode::Networked,
            GameMode::SinglePlayer | GameMode::Tutorial => RouteMode::Local,
        };

        Self {
            world: WorldMirror::new(&config.sync),
            applier: SyncApplier::new(config.sync.clone()),
            stepper: MotionStepper::new(),
            sounds: SoundTracker::new(
                config.sound.clone(),
                Box::new(seaward_simulation::NullSoundPlayer::default()),
            ),
            router: OutgoingRouter::with_limit(route_mode, config.sync.max_pending_intents),
            transport: None,
            discovery: None,
            events_rx,
            local: None,
            last_local_step: None,
            script: None,
            init_loop_generation: None,
            status: SessionStatus::new(mode),
            mode,
            config,
        }
    }

    /// Replaces the audio backend
    pub fn with_sound_player(mut self, player: Box<dyn SoundPlayer>) -> Self {
        self.sounds = SoundTracker::new(self.config.sound.clone(), player);
        self
    }

    /// Replaces endpoint discovery
    pub fn with_discovery(mut self, discovery: Box<dyn Discovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn world(&self) -> &WorldMirror {
        &self.world
    }

    pub fn router(&self) -> &OutgoingRouter {
        &self.router
    }

    pub fn sounds(&self) -> &SoundTracker {
        &self.sounds
    }

    pub fn transport(&self) -> Option<&TransportSession> {
        self.transport.as_ref()
    }

    /// Starts the session
    ///
    /// Multiplayer sessions resolve their endpoint (once) and connect; local
    /// sessions install the simulation's world.
    pub async fn start(&mut self) -> Result<(), ClientError> {
        if let Some(simulation) = self.local.as_ref() {
            let now = Instant::now();
            let frame = simulation.initialization();
            let players = simulation.players();
            self.applier.apply_initialization(&mut self.world, frame, now);
            self.applier.apply_players(&mut self.world, players);
            self.last_local_step = Some(now);

            tracing::info!(mode = ?self.mode, "Local session started");
            return Ok(());
        }

        let Some(transport) = self.transport.as_mut() else {
            return Err(ClientError::NoTransport);
        };

        if let Some(discovery) = self.discovery.take() {
            transport.set_state(ConnectionState::Discovering);
            self.status.state = transport.state();

            match discovery.resolve().await {
                Ok(endpoint) => transport.set_endpoint(endpoint),
                Err(e) => {
                    tracing::error!(error = %e, "Endpoint discovery failed");
                    transport.set_state(ConnectionState::Closed);
                    self.status.state = transport.state();
                    self.status.discovery_error = Some(e.to_string());
                    return Err(e.into());
                }
            }
        }

        transport.connect();
        self.status.state = transport.state();
        Ok(())
    }

    /// Uses `name` for `join-game`, now if connected and after every
    /// reconnect
    pub fn login(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.config.player_name = Some(name.clone());

        if let Some(transport) = self.transport.as_mut() {
            transport.auto_login = true;
            if transport.state().is_open() || transport.state().is_initialized() {
                self.send_control(&ClientMessage::join(name));
            }
        }
    }

    /// Queues a player intent and routes everything queued so far
    pub fn send_intent(&mut self, intent: Intent) -> u64 {
        let sequence = self.world.push_intent(intent);
        self.pump_intents();
        sequence
    }

    /// Drops the connection and reconnects right away
    pub fn reconnect_now(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        transport.close();
        transport.connect();
        self.router.detach();
        self.status.reconnecting = false;
        self.status.state = transport.state();
    }

    /// Waits for the next session event
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Handles the next session event; false once no more can arrive
    pub async fn process_next(&mut self) -> bool {
        match self.next_event().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Applies one session event
    ///
    /// Events from a previous generation are ignored.
    pub fn handle_event(&mut self, event: SessionEvent) {
        let Some(transport) = self.transport.as_ref() else {
            return;
        };
        if !transport.is_current(event.generation()) {
            tracing::debug!(
                generation = event.generation(),
                current = transport.generation(),
                "Ignoring stale session event"
            );
            return;
        }

        match event {
            SessionEvent::Opened { .. } => self.on_open(),
            SessionEvent::Message { envelope, .. } => self.on_message(envelope),
            SessionEvent::Closed { error, .. } => self.on_close(error),
            SessionEvent::Timer { kind, .. } => self.on_timer(kind),
        }

        if let Some(transport) = self.transport.as_ref() {
            self.status.state = transport.state();
        }
    }

    /// Advances the world to `now`
    pub fn render_tick(&mut self, now: Instant) -> TickReport {
        if self.script.is_some() {
            self.run_script();
        }
        self.pump_intents();

        if self.local.is_some() {
            self.step_local(now);
        }

        let delta = self.stepper.step(&mut self.world, now);
        let sounds = self.sounds.process(&self.world, TickSource::Render);

        TickReport { delta, sounds }
    }

    /// Drives the session: session events as they arrive, render ticks at
    /// `render_interval`
    ///
    /// Multiplayer sessions return once their event channel closes; local
    /// sessions run until the future is dropped.
    pub async fn run(&mut self) {
        let mut ticker = tokio::time::interval(self.config.render_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        if self.transport.is_none() {
            loop {
                ticker.tick().await;
                self.render_tick(Instant::now());
            }
        }

        loop {
            tokio::select! {
                event = self.events_rx.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.render_tick(Instant::now());
                }
            }
        }
    }

    /// Closes the transport, cancels timers and drops queued messages
    pub fn shutdown(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            transport.close();
            self.status.state = transport.state();
        }
        self.router.discard();
        self.sounds.stop_all();
        self.status.reconnecting = false;

        tracing::info!(mode = ?self.mode, "Game session shut down");
    }

    fn on_open(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        transport.set_state(ConnectionState::Open);
        let auto_login = transport.auto_login;
        let link = transport.link();
        self.status.reconnecting = false;
        self.status.redirect = None;

        self.send_control(&ClientMessage::GetWorld);
        if auto_login {
            if let Some(name) = self.config.player_name.clone() {
                self.send_control(&ClientMessage::join(name));
            }
        }

        if let Some(link) = link {
            self.router.attach(link);
        }
    }

    fn on_message(&mut self, envelope: Envelope) {
        if envelope.event == events::SEND_FRAME {
            // Sent before decoding so frames are not coalesced in transit
            self.send_control(&ClientMessage::Ack);
        }

        let message = match ServerMessage::from_envelope(&envelope) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(event = %envelope.event, error = %e, "Dropping malformed message");
                return;
            }
        };

        let now = Instant::now();
        match message {
            ServerMessage::SendWorld(frame) => {
                self.applier.apply_initialization(&mut self.world, frame, now);
                self.sounds.process(&self.world, TickSource::Reconcile);
                self.on_world_applied();
            }
            ServerMessage::SendFrame(frame) => {
                if !self.world.is_initialized() {
                    tracing::debug!("Ignoring frame received before the world");
                    return;
                }
                self.applier.apply_sync(&mut self.world, frame, now);
                self.sounds.process(&self.world, TickSource::Reconcile);
            }
            ServerMessage::SendPlayers(update) => {
                self.applier.apply_players(&mut self.world, update);
            }
            ServerMessage::SendSpawnFactions(options) => self.status.menus.factions = options,
            ServerMessage::SendSpawnPlanets(options) => self.status.menus.planets = options,
            ServerMessage::SendSpawnLocations(options) => self.status.menus.locations = options,
            ServerMessage::ShardPortNumber(shard) => self.on_shard(shard),
            ServerMessage::Generic(event) => {
                self.applier.apply_event(&mut self.world, event);
                self.sounds.process(&self.world, TickSource::Reconcile);
            }
        }
    }

    fn on_world_applied(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        transport.set_state(ConnectionState::Initialized);

        let generation = transport.generation();
        if self.init_loop_generation != Some(generation) {
            self.init_loop_generation = Some(generation);
            transport.schedule(TimerKind::InitLoop, self.config.init_loop_delay);
        }
    }

    fn on_shard(&mut self, shard: ShardPort) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        let target = transport.endpoint().with_port(shard.port_number);

        self.applier.apply_disconnect(&mut self.world);
        self.sounds.stop_all();
        self.router.detach();

        if shard.is_standalone {
            tracing::info!(endpoint = %target.url(), "Rerouting to shard");
            transport.set_endpoint(target);
            transport.connect();
        } else {
            tracing::info!(endpoint = %target.url(), "Redirecting to shard");
            transport.close();
            self.status.redirect = Some(target.url());
        }
    }

    fn on_close(&mut self, error: Option<String>) {
        match &error {
            Some(error) => tracing::warn!(%error, "Connection lost"),
            None => tracing::info!("Connection closed"),
        }

        self.applier.apply_disconnect(&mut self.world);
        self.sounds.stop_all();
        self.router.detach();

        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        transport.handle_closed();
        transport.auto_login = self.config.player_name.is_some();
        transport.set_state(ConnectionState::Reconnecting);
        transport.schedule(TimerKind::Reconnect, self.config.reconnect_delay);
        self.status.reconnecting = true;
    }

    fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Reconnect => {
                if let Some(transport) = self.transport.as_mut() {
                    if transport.state().is_reconnecting() {
                        self.status.reconnecting = false;
                        transport.connect();
                    }
                }
            }
            TimerKind::InitLoop => {
                self.send_control(&ClientMessage::InitLoop);
            }
        }
    }

    /// Sends a session-level message; dropped when not connected
    fn send_control(&self, message: &ClientMessage) {
        let Some(transport) = self.transport.as_ref() else {
            return;
        };
        if let Err(e) = transport.send(message) {
            tracing::debug!(event = message.event(), error = %e, "Control message not sent");
        }
    }

    fn pump_intents(&mut self) {
        for pending in self.world.drain_intents() {
            self.router.send_message(ClientMessage::Generic(pending.intent));
        }
    }

    fn step_local(&mut self, now: Instant) {
        let Some(simulation) = self.local.as_mut() else {
            return;
        };

        let player_id = self
            .world
            .binding()
            .map(|binding| binding.player_id.clone())
            .unwrap_or_else(|| LOCAL_PLAYER_ID.to_string());
        for message in self.router.drain_local() {
            simulation.handle_message(&player_id, &message);
        }

        let delta_time = self
            .last_local_step
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_local_step = Some(now);

        let frame = simulation.step(delta_time);
        self.applier.apply_sync(&mut self.world, frame, now);
        self.sounds.process(&self.world, TickSource::Reconcile);
    }

    fn run_script(&mut self) {
        let Some(script) = self.script.as_mut() else {
            return;
        };

        let mut intents = Vec::new();
        let mut ctx = ScriptContext {
            world: &self.world,
            intents: &mut intents,
            prompt: &mut self.status.prompt,
        };
        if script.tick(&mut ctx) {
            tracing::info!("Tutorial script finished");
            self.script = None;
        }

        for intent in intents {
            self.world.push_intent(intent);
        }
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("mode", &self.mode)
            .field("status", &self.status)
            .field("entities", &self.world.entity_count())
            .finish()
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.sounds.stop_all();
    }
}
