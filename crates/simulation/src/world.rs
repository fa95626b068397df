//! Client-side mirror of the simulation world
//!
//! The renderer and the UI read the mirror freely. Entity fields are only
//! written by [`crate::SyncApplier`] and [`crate::MotionStepper`], enforced by
//! crate-private mutators.

use std::collections::HashMap;

use seaward_protocol::{
    EntityId, EntityKind, EntityState, FactionRecord, Intent, PlayerRecord, SimulationEvent,
};

use crate::motion::RenderClock;
use crate::{IntentQueue, PendingIntent, SyncConfig};

/// Binding of this client to a player record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPlayerBinding {
    pub player_id: EntityId,
}

/// Event stored in the mirror's event log
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub event: SimulationEvent,

    /// Appended between the previous frame and this one and carried over
    /// because the frame did not contain it
    pub carried: bool,
}

/// Simulation events of the current frame
///
/// Each frame replaces the log and bumps `batch`; events arriving between
/// frames are appended to the current batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    batch: u64,
    entries: Vec<LoggedEvent>,
    frame_len: usize,
}

impl EventLog {
    pub fn batch(&self) -> u64 {
        self.batch
    }

    pub fn entries(&self) -> &[LoggedEvent] {
        &self.entries
    }

    pub fn events(&self) -> impl Iterator<Item = &SimulationEvent> {
        self.entries.iter().map(|entry| &entry.event)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries installed by the last frame
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Entries appended since the last frame replaced the log
    pub fn appended(&self) -> &[LoggedEvent] {
        &self.entries[self.frame_len.min(self.entries.len())..]
    }

    pub(crate) fn replace(&mut self, entries: Vec<LoggedEvent>) {
        self.batch += 1;
        self.frame_len = entries.len();
        self.entries = entries;
    }

    pub(crate) fn push(&mut self, event: SimulationEvent) {
        self.entries.push(LoggedEvent {
            event,
            carried: false,
        });
    }
}

/// Local copy of every entity, faction and player
#[derive(Debug, Clone)]
pub struct WorldMirror {
    ships: HashMap<EntityId, EntityState>,
    cannonballs: HashMap<EntityId, EntityState>,
    crates: HashMap<EntityId, EntityState>,

    /// Locally predicted entities not known to the server (camera anchors)
    ghosts: HashMap<EntityId, EntityState>,

    factions: HashMap<EntityId, FactionRecord>,
    players: HashMap<EntityId, PlayerRecord>,
    binding: Option<LocalPlayerBinding>,

    events: EventLog,
    outgoing: IntentQueue,

    pub(crate) clock: RenderClock,
    initialized: bool,
}

impl WorldMirror {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            ships: HashMap::new(),
            cannonballs: HashMap::new(),
            crates: HashMap::new(),
            ghosts: HashMap::new(),
            factions: HashMap::new(),
            players: HashMap::new(),
            binding: None,
            events: EventLog::default(),
            outgoing: IntentQueue::new(config.max_pending_intents),
            clock: RenderClock::new(config.default_frame_interval, config.min_reset_interval),
            initialized: false,
        }
    }

    pub fn ships(&self) -> &HashMap<EntityId, EntityState> {
        &self.ships
    }

    pub fn cannonballs(&self) -> &HashMap<EntityId, EntityState> {
        &self.cannonballs
    }

    pub fn crates(&self) -> &HashMap<EntityId, EntityState> {
        &self.crates
    }

    pub fn ghosts(&self) -> &HashMap<EntityId, EntityState> {
        &self.ghosts
    }

    pub fn entities(&self, kind: EntityKind) -> &HashMap<EntityId, EntityState> {
        match kind {
            EntityKind::Ship => &self.ships,
            EntityKind::Cannonball => &self.cannonballs,
            EntityKind::Crate => &self.crates,
        }
    }

    pub fn entity(&self, kind: EntityKind, id: &str) -> Option<&EntityState> {
        self.entities(kind).get(id)
    }

    /// Number of server-known entities of every kind
    pub fn entity_count(&self) -> usize {
        self.ships.len() + self.cannonballs.len() + self.crates.len()
    }

    pub fn factions(&self) -> &HashMap<EntityId, FactionRecord> {
        &self.factions
    }

    pub fn players(&self) -> &HashMap<EntityId, PlayerRecord> {
        &self.players
    }

    pub fn binding(&self) -> Option<&LocalPlayerBinding> {
        self.binding.as_ref()
    }

    /// Record of the player bound to this client
    pub fn local_player(&self) -> Option<&PlayerRecord> {
        let binding = self.binding.as_ref()?;
        self.players.get(&binding.player_id)
    }

    /// Id of the ship the local player controls
    pub fn controlled_entity_id(&self) -> Option<&str> {
        self.local_player()?.ship_id.as_deref()
    }

    pub fn controlled_entity(&self) -> Option<&EntityState> {
        self.ships.get(self.controlled_entity_id()?)
    }

    pub fn autopilot_enabled(&self) -> bool {
        self.local_player().map(|player| player.autopilot).unwrap_or(false)
    }

    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    pub fn events(&self) -> impl Iterator<Item = &SimulationEvent> {
        self.events.events()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn clock(&self) -> &RenderClock {
        &self.clock
    }

    /// Queues a locally originated intent for the outgoing router
    pub fn push_intent(&mut self, intent: Intent) -> u64 {
        self.outgoing.push(intent)
    }

    /// Takes every queued intent in submission order
    pub fn drain_intents(&mut self) -> Vec<PendingIntent> {
        self.outgoing.drain()
    }

    pub fn pending_intents(&self) -> usize {
        self.outgoing.len()
    }

    pub(crate) fn entities_mut(&mut self, kind: EntityKind) -> &mut HashMap<EntityId, EntityState> {
        match kind {
            EntityKind::Ship => &mut self.ships,
            EntityKind::Cannonball => &mut self.cannonballs,
            EntityKind::Crate => &mut self.crates,
        }
    }

    pub(crate) fn ghosts_mut(&mut self) -> &mut HashMap<EntityId, EntityState> {
        &mut self.ghosts
    }

    /// Every moving entity, ghosts included
    pub(crate) fn moving_entities_mut(&mut self) -> impl Iterator<Item = &mut EntityState> {
        self.ships
            .values_mut()
            .chain(self.cannonballs.values_mut())
            .chain(self.crates.values_mut())
            .chain(self.ghosts.values_mut())
    }

    pub(crate) fn factions_mut(&mut self) -> &mut HashMap<EntityId, FactionRecord> {
        &mut self.factions
    }

    pub(crate) fn set_players(&mut self, players: Vec<PlayerRecord>) {
        self.players = players
            .into_iter()
            .map(|player| (player.id.clone(), player))
            .collect();
    }

    pub(crate) fn set_binding(&mut self, binding: Option<LocalPlayerBinding>) {
        self.binding = binding;
    }

    pub(crate) fn events_mut(&mut self) -> &mut EventLog {
        &mut self.events
    }

    pub(crate) fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    /// Drops all world state; queued intents survive
    pub(crate) fn clear(&mut self) {
        self.ships.clear();
        self.cannonballs.clear();
        self.crates.clear();
        self.ghosts.clear();
        self.factions.clear();
        self.players.clear();
        self.binding = None;
        self.events.replace(Vec::new());
        self.clock.clear();
        self.initialized = false;
    }
}

impl Default for WorldMirror {
    fn default() -> Self {
        Self::new(&SyncConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controlled_entity_lookup() {
        let mut world = WorldMirror::default();
        world
            .entities_mut(EntityKind::Ship)
            .insert("s1".into(), EntityState::new("s1"));
        world.set_players(vec![PlayerRecord::new("p1").controlling("s1").with_autopilot(true)]);

        assert_eq!(world.controlled_entity_id(), None);

        world.set_binding(Some(LocalPlayerBinding {
            player_id: "p1".into(),
        }));
        assert_eq!(world.controlled_entity_id(), Some("s1"));
        assert_eq!(world.controlled_entity().map(|s| s.id.as_str()), Some("s1"));
        assert!(world.autopilot_enabled());
    }

    #[test]
    fn test_clear_keeps_intents() {
        let mut world = WorldMirror::default();
        world
            .entities_mut(EntityKind::Crate)
            .insert("c1".into(), EntityState::new("c1"));
        world.set_initialized(true);
        world.push_intent(Intent::Fire);

        world.clear();

        assert_eq!(world.entity_count(), 0);
        assert!(!world.is_initialized());
        assert_eq!(world.pending_intents(), 1);
    }

    #[test]
    fn test_event_log_batches() {
        let mut log = EventLog::default();
        log.push(SimulationEvent::Unknown);
        assert_eq!(log.batch(), 0);
        assert_eq!(log.len(), 1);

        assert_eq!(log.appended().len(), 1);

        log.replace(Vec::new());
        assert_eq!(log.batch(), 1);
        assert!(log.is_empty());

        log.push(SimulationEvent::Unknown);
        assert_eq!(log.appended().len(), 1);
    }
}
