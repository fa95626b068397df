//! World data model shared by the wire format and the client mirror
//!
//! Positions and orientations are unit quaternions. A position is a point on
//! the unit sphere (the quaternion applied to a fixed reference vector); a
//! velocity quaternion encodes the rotation covered in one server frame.

use glam::DQuat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stable identifier of a ship, cannonball, crate, faction or player
pub type EntityId = String;

/// Kinds of moving entities tracked by the mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Ship,
    Cannonball,
    Crate,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Ship, EntityKind::Cannonball, EntityKind::Crate];
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Ship => write!(f, "ship"),
            EntityKind::Cannonball => write!(f, "cannonball"),
            EntityKind::Crate => write!(f, "crate"),
        }
    }
}

/// Authoritative state of one moving entity
///
/// Fields the client does not interpret (health, cargo, ...) are kept in
/// `attributes` so they reach the renderer untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityState {
    pub id: EntityId,

    #[serde(default)]
    pub position: DQuat,

    #[serde(default)]
    pub orientation: DQuat,

    #[serde(default)]
    pub position_velocity: DQuat,

    #[serde(default)]
    pub orientation_velocity: DQuat,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    /// Creates a resting entity at the reference point
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            position: DQuat::IDENTITY,
            orientation: DQuat::IDENTITY,
            position_velocity: DQuat::IDENTITY,
            orientation_velocity: DQuat::IDENTITY,
            attributes: Map::new(),
        }
    }

    pub fn with_pose(mut self, position: DQuat, orientation: DQuat) -> Self {
        self.position = position;
        self.orientation = orientation;
        self
    }

    pub fn with_velocity(mut self, position_velocity: DQuat, orientation_velocity: DQuat) -> Self {
        self.position_velocity = position_velocity;
        self.orientation_velocity = orientation_velocity;
        self
    }

    /// Returns true if either velocity is not the identity rotation
    pub fn is_moving(&self) -> bool {
        self.position_velocity != DQuat::IDENTITY || self.orientation_velocity != DQuat::IDENTITY
    }
}

/// Faction record; the client only needs its identity and opaque attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionRecord {
    pub id: EntityId,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl FactionRecord {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }
}

/// Per-player record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: EntityId,

    /// Ship controlled by this player, if spawned
    #[serde(default)]
    pub ship_id: Option<EntityId>,

    #[serde(default)]
    pub faction_id: Option<EntityId>,

    #[serde(default)]
    pub autopilot: bool,
}

impl PlayerRecord {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            ship_id: None,
            faction_id: None,
            autopilot: false,
        }
    }

    pub fn controlling(mut self, ship_id: impl Into<EntityId>) -> Self {
        self.ship_id = Some(ship_id.into());
        self
    }

    pub fn with_autopilot(mut self, autopilot: bool) -> Self {
        self.autopilot = autopilot;
        self
    }
}

/// Payload of `send-players`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayersUpdate {
    pub players: Vec<PlayerRecord>,
    pub player_id: EntityId,
}

/// Full world dump sent as `send-world`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializationFrame {
    #[serde(default)]
    pub ships: Vec<EntityState>,

    #[serde(default)]
    pub cannonballs: Vec<EntityState>,

    #[serde(default)]
    pub crates: Vec<EntityState>,

    #[serde(default)]
    pub factions: Vec<FactionRecord>,

    #[serde(default)]
    pub players: Vec<PlayerRecord>,

    /// Player bound to this connection, when already known
    #[serde(default)]
    pub player_id: Option<EntityId>,
}

impl InitializationFrame {
    pub fn entities(&self, kind: EntityKind) -> &[EntityState] {
        match kind {
            EntityKind::Ship => &self.ships,
            EntityKind::Cannonball => &self.cannonballs,
            EntityKind::Crate => &self.crates,
        }
    }
}

/// Per-kind delta inside a [`SyncFrame`]
///
/// `ids` enumerates every live entity of the kind; anything not listed is
/// gone. `None` means the frame carries no enumeration for the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindDelta<T> {
    #[serde(default)]
    pub ids: Option<Vec<EntityId>>,

    #[serde(default = "Vec::new")]
    pub updated: Vec<T>,
}

impl<T> Default for KindDelta<T> {
    fn default() -> Self {
        Self {
            ids: None,
            updated: Vec::new(),
        }
    }
}

impl<T> KindDelta<T> {
    pub fn new(ids: Option<Vec<EntityId>>, updated: Vec<T>) -> Self {
        Self { ids, updated }
    }
}

/// Incremental authoritative frame sent as `send-frame`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncFrame {
    #[serde(default)]
    pub ships: KindDelta<EntityState>,

    #[serde(default)]
    pub cannonballs: KindDelta<EntityState>,

    #[serde(default)]
    pub crates: KindDelta<EntityState>,

    #[serde(default)]
    pub factions: KindDelta<FactionRecord>,

    /// Simulation events emitted during the frame
    #[serde(default)]
    pub events: Vec<SimulationEvent>,
}

impl SyncFrame {
    pub fn delta(&self, kind: EntityKind) -> &KindDelta<EntityState> {
        match kind {
            EntityKind::Ship => &self.ships,
            EntityKind::Cannonball => &self.cannonballs,
            EntityKind::Crate => &self.crates,
        }
    }

    pub fn delta_mut(&mut self, kind: EntityKind) -> &mut KindDelta<EntityState> {
        match kind {
            EntityKind::Ship => &mut self.ships,
            EntityKind::Cannonball => &mut self.cannonballs,
            EntityKind::Crate => &mut self.crates,
        }
    }
}

/// Name of a sound sample, e.g. `cannonFire` or `sailing`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundType(pub String);

impl SoundType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SoundType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SoundEventKind {
    /// Played once when the event is seen
    OneOff,
    /// Plays for as long as the event keeps appearing
    Continuous,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundEvent {
    pub ship_id: EntityId,
    pub sound_type: SoundType,
    pub event_kind: SoundEventKind,
}

impl SoundEvent {
    pub fn one_off(ship_id: impl Into<EntityId>, sound_type: impl Into<String>) -> Self {
        Self {
            ship_id: ship_id.into(),
            sound_type: SoundType::new(sound_type),
            event_kind: SoundEventKind::OneOff,
        }
    }

    pub fn continuous(ship_id: impl Into<EntityId>, sound_type: impl Into<String>) -> Self {
        Self {
            ship_id: ship_id.into(),
            sound_type: SoundType::new(sound_type),
            event_kind: SoundEventKind::Continuous,
        }
    }
}

/// Events emitted by the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SimulationEvent {
    Sound(SoundEvent),
    Combat {
        attacker_id: EntityId,
        target_id: EntityId,
        #[serde(default)]
        damage: f64,
    },
    Death {
        ship_id: EntityId,
    },
    #[serde(other)]
    Unknown,
}

impl SimulationEvent {
    pub fn as_sound(&self) -> Option<&SoundEvent> {
        match self {
            SimulationEvent::Sound(sound) => Some(sound),
            _ => None,
        }
    }
}

/// Locally originated player intent, carried by `generic-message`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Intent {
    /// Currently held movement keys
    Steer {
        #[serde(default)]
        forward: bool,
        #[serde(default)]
        backward: bool,
        #[serde(default)]
        left: bool,
        #[serde(default)]
        right: bool,
    },
    Fire,
    Autopilot {
        enabled: bool,
    },
    ChooseFaction {
        faction_id: EntityId,
    },
    ChoosePlanet {
        planet_id: EntityId,
    },
    ChooseLocation {
        location_id: EntityId,
    },
}

/// Entry of a spawn menu list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuOption {
    pub id: EntityId,

    #[serde(default)]
    pub name: String,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Payload of `shard-port-number`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardPort {
    pub port_number: u16,
    pub is_standalone: bool,
}
