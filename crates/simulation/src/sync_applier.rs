//! Applies authoritative frames to the world mirror
//!
//! Initialization frames replace the mirror. Sync frames merge into it:
//! updated entities are overwritten, entities missing from a kind's id
//! enumeration are removed, and the controlled ship is reconciled against the
//! local prediction before the merge.

use std::collections::HashSet;
use std::time::Instant;

use seaward_protocol::{
    EntityKind, EntityState, InitializationFrame, PlayersUpdate, SimulationEvent,
    SoundEventKind, SyncFrame,
};

use crate::quat::SphereQuat;
use crate::world::{LocalPlayerBinding, LoggedEvent, WorldMirror};
use crate::SyncConfig;

/// Id of the ghost that keeps the camera in place while disconnected
pub const CAMERA_GHOST_ID: &str = "ghost:camera";

/// Outcome of reconciling the controlled ship
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reconciliation {
    /// Server position within the threshold; the local prediction was kept
    KeptPrediction { distance: f64 },

    /// Server position taken verbatim
    TookServer { distance: f64, autopilot: bool },
}

/// Summary of one applied sync frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Entities written from the frame
    pub updated: usize,

    /// Entities removed because they were missing from an id enumeration
    pub removed: usize,

    /// Set when the frame carried the controlled ship
    pub reconciliation: Option<Reconciliation>,

    /// Controlled-ship sound events carried into the new event log
    pub carried_events: usize,

    /// Whether this frame updated the measured frame interval
    pub interval_measured: bool,
}

/// Merges server frames into a [`WorldMirror`]
///
/// # Example
///
/// ```rust
/// use std::time::Instant;
/// use seaward_protocol::{EntityState, InitializationFrame, KindDelta, SyncFrame};
/// use seaward_simulation::{SyncApplier, SyncConfig, WorldMirror};
///
/// let applier = SyncApplier::new(SyncConfig::default());
/// let mut world = WorldMirror::default();
///
/// applier.apply_initialization(
///     &mut world,
///     InitializationFrame {
///         ships: vec![EntityState::new("a"), EntityState::new("b")],
///         ..Default::default()
///     },
///     Instant::now(),
/// );
///
/// let frame = SyncFrame {
///     ships: KindDelta::new(Some(vec!["a".into()]), Vec::new()),
///     ..Default::default()
/// };
/// let report = applier.apply_sync(&mut world, frame, Instant::now());
///
/// assert_eq!(report.removed, 1);
/// assert!(world.ships().contains_key("a"));
/// ```
#[derive(Debug, Clone)]
pub struct SyncApplier {
    config: SyncConfig,
}

impl SyncApplier {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Replaces the mirror with a full world dump
    ///
    /// Entities, factions and events are cleared and replaced by the frame's.
    /// Players and the local binding are the exception: a dump that leaves
    /// out `players` or `playerId` keeps the current ones, since the server
    /// sends those separately through `send-players`. A disconnect clears
    /// both, so a new connection never inherits them.
    ///
    /// Returns true if the mirror was not initialized before, i.e. this is
    /// the first world of the connection.
    pub fn apply_initialization(
        &self,
        world: &mut WorldMirror,
        frame: InitializationFrame,
        now: Instant,
    ) -> bool {
        let first = !world.is_initialized();
        let InitializationFrame {
            ships,
            cannonballs,
            crates,
            factions,
            players,
            player_id,
        } = frame;

        let binding = player_id
            .map(|player_id| LocalPlayerBinding { player_id })
            .or_else(|| world.binding().cloned());
        let players = if players.is_empty() {
            world.players().values().cloned().collect()
        } else {
            players
        };

        world.clear();
        install_all(world, EntityKind::Ship, ships);
        install_all(world, EntityKind::Cannonball, cannonballs);
        install_all(world, EntityKind::Crate, crates);
        world.factions_mut().extend(
            factions
                .into_iter()
                .map(|faction| (faction.id.clone(), faction)),
        );
        world.set_players(players);
        world.set_binding(binding);
        world.set_initialized(true);
        world.clock.restart(now);

        tracing::info!(
            ships = world.ships().len(),
            cannonballs = world.cannonballs().len(),
            crates = world.crates().len(),
            factions = world.factions().len(),
            first,
            "Applied initialization frame"
        );

        first
    }

    /// Merges an incremental frame
    pub fn apply_sync(&self, world: &mut WorldMirror, mut frame: SyncFrame, now: Instant) -> SyncReport {
        let mut report = SyncReport {
            reconciliation: self.reconcile(world, &mut frame),
            ..Default::default()
        };

        for kind in EntityKind::ALL {
            let delta = std::mem::take(frame.delta_mut(kind));
            let entities = world.entities_mut(kind);

            if let Some(ids) = &delta.ids {
                let live: HashSet<&str> = ids.iter().map(String::as_str).collect();
                let before = entities.len();
                entities.retain(|id, _| live.contains(id.as_str()));
                report.removed += before - entities.len();
            }

            for state in delta.updated {
                entities.insert(state.id.clone(), normalized(state));
                report.updated += 1;
            }
        }

        let factions = std::mem::take(&mut frame.factions);
        if let Some(ids) = &factions.ids {
            let live: HashSet<&str> = ids.iter().map(String::as_str).collect();
            world
                .factions_mut()
                .retain(|id, _| live.contains(id.as_str()));
        }
        world.factions_mut().extend(
            factions
                .updated
                .into_iter()
                .map(|faction| (faction.id.clone(), faction)),
        );

        let entries = self.merge_events(world, frame.events);
        report.carried_events = entries.iter().filter(|entry| entry.carried).count();
        world.events_mut().replace(entries);

        report.interval_measured = world.clock.reset(now);

        tracing::debug!(
            updated = report.updated,
            removed = report.removed,
            reconciliation = ?report.reconciliation,
            frame_interval_ms = world.clock().frame_interval().as_millis() as u64,
            "Applied sync frame"
        );

        report
    }

    /// Replaces the player records and binds the local player
    pub fn apply_players(&self, world: &mut WorldMirror, update: PlayersUpdate) {
        tracing::debug!(
            players = update.players.len(),
            player_id = %update.player_id,
            "Applied player list"
        );
        world.set_players(update.players);
        world.set_binding(Some(LocalPlayerBinding {
            player_id: update.player_id,
        }));
    }

    /// Appends an event that arrived outside a frame
    pub fn apply_event(&self, world: &mut WorldMirror, event: SimulationEvent) {
        world.events_mut().push(event);
    }

    /// Resets the mirror after the connection closed
    ///
    /// Entities, players and the binding are dropped; queued intents are
    /// kept. The controlled ship's last pose stays behind as a motionless
    /// ghost so the camera has an anchor until the next world arrives.
    pub fn apply_disconnect(&self, world: &mut WorldMirror) {
        let anchor = world
            .controlled_entity()
            .or_else(|| world.ghosts().get(CAMERA_GHOST_ID))
            .map(|ship| (ship.position, ship.orientation));

        world.clear();

        if let Some((position, orientation)) = anchor {
            self.install_ghost(
                world,
                EntityState::new(CAMERA_GHOST_ID).with_pose(position, orientation),
            );
        }

        tracing::info!(camera_anchor = anchor.is_some(), "World mirror reset after disconnect");
    }

    /// Adds or replaces a locally predicted entity
    pub fn install_ghost(&self, world: &mut WorldMirror, state: EntityState) {
        world.ghosts_mut().insert(state.id.clone(), normalized(state));
    }

    /// Keeps the local prediction for the controlled ship when the server
    /// position is close enough and autopilot is off
    fn reconcile(&self, world: &WorldMirror, frame: &mut SyncFrame) -> Option<Reconciliation> {
        let controlled_id = world.controlled_entity_id()?;
        let predicted = world.ships().get(controlled_id)?;
        let server = frame
            .ships
            .updated
            .iter_mut()
            .find(|state| state.id == controlled_id)?;

        let distance = predicted.position.angular_distance(server.position);
        let autopilot = world.autopilot_enabled();

        if distance < self.config.reconciliation_threshold && !autopilot {
            server.position = predicted.position;
            server.orientation = predicted.orientation;
            Some(Reconciliation::KeptPrediction { distance })
        } else {
            if distance >= self.config.reconciliation_threshold {
                tracing::debug!(distance, ship = %controlled_id, "Prediction diverged, taking server state");
            }
            Some(Reconciliation::TookServer { distance, autopilot })
        }
    }

    /// Builds the next event log: the frame's events, followed by sound
    /// events that arrived after the previous frame and that this frame does
    /// not know about
    ///
    /// Every sound of the controlled ship is carried, and so are one-offs of
    /// other ships. Whether a carried one-off still has to be played is up to
    /// the sound tracker.
    fn merge_events(&self, world: &WorldMirror, events: Vec<SimulationEvent>) -> Vec<LoggedEvent> {
        let controlled_id = world.controlled_entity_id();
        let carried: Vec<SimulationEvent> = world
            .event_log()
            .appended()
            .iter()
            .map(|entry| &entry.event)
            .filter(|event| {
                event.as_sound().is_some_and(|sound| {
                    sound.event_kind == SoundEventKind::OneOff
                        || controlled_id == Some(sound.ship_id.as_str())
                })
            })
            .filter(|event| !events.contains(event))
            .cloned()
            .collect();

        events
            .into_iter()
            .map(|event| LoggedEvent {
                event,
                carried: false,
            })
            .chain(carried.into_iter().map(|event| LoggedEvent {
                event,
                carried: true,
            }))
            .collect()
    }
}

impl Default for SyncApplier {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

fn install_all(world: &mut WorldMirror, kind: EntityKind, states: Vec<EntityState>) {
    let entities = world.entities_mut(kind);
    for state in states {
        entities.insert(state.id.clone(), normalized(state));
    }
}

fn normalized(mut state: EntityState) -> EntityState {
    state.position = state.position.renormalized();
    state.orientation = state.orientation.renormalized();
    state.position_velocity = state.position_velocity.renormalized();
    state.orientation_velocity = state.orientation_velocity.renormalized();
    state
}
