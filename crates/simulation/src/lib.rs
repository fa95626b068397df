//! # Seaward Simulation Layer
//!
//! Client-side mirror of the authoritative world, kept smooth between server
//! frames by prediction and reconciliation.
//!
//! ## Architecture
//!
//! - [`WorldMirror`]: local copy of ships, cannonballs, crates, factions and
//!   players. Only the [`SyncApplier`] and the [`MotionStepper`] write it.
//! - [`SyncApplier`]: merges initialization and sync frames, reconciling the
//!   locally controlled ship against server corrections.
//! - [`MotionStepper`]: spherical dead reckoning on every render tick.
//! - [`SoundTracker`]: one-off and continuous sound bookkeeping.
//! - [`Script`]: tick-driven scripted sequences for the tutorial.
//! - [`LocalSimulation`]: in-process simulation used instead of a server in
//!   single-player modes.
//!
//! ## Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use glam::{DQuat, DVec3};
//! use seaward_protocol::{EntityState, InitializationFrame};
//! use seaward_simulation::{MotionStepper, SyncApplier, SyncConfig, WorldMirror};
//!
//! let mut world = WorldMirror::new(&SyncConfig::default());
//! let applier = SyncApplier::new(SyncConfig::default());
//!
//! let ship = EntityState::new("ship-1")
//!     .with_velocity(DQuat::from_axis_angle(DVec3::X, 0.01), DQuat::IDENTITY);
//! let frame = InitializationFrame { ships: vec![ship], ..Default::default() };
//!
//! let start = Instant::now();
//! applier.apply_initialization(&mut world, frame, start);
//! MotionStepper::new().step(&mut world, start + Duration::from_millis(50));
//!
//! assert!(world.ships()["ship-1"].position != DQuat::IDENTITY);
//! ```

pub mod config;
pub mod motion;
pub mod quat;
pub mod script;
pub mod sound;
pub mod sync_applier;
pub mod world;

use std::collections::VecDeque;

use seaward_protocol::{ClientMessage, InitializationFrame, Intent, PlayersUpdate, SyncFrame};

pub use config::{SoundConfig, SyncConfig};
pub use motion::{MotionStepper, RenderClock};
pub use quat::SphereQuat;
pub use script::{Script, ScriptContext, Step, StepStatus};
pub use sound::{NullSoundPlayer, PlaybackHandle, SoundPass, SoundPlayer, SoundTracker, TickSource};
pub use sync_applier::{Reconciliation, SyncApplier, SyncReport};
pub use world::{EventLog, LocalPlayerBinding, LoggedEvent, WorldMirror};

/// In-process simulation driven by the client in single-player modes
///
/// The client feeds it the messages the router queued, steps it once per
/// render tick and applies the returned frame like a server frame.
///
/// # Example
///
/// ```rust
/// # use seaward_protocol::{ClientMessage, InitializationFrame, PlayersUpdate, SyncFrame};
/// # use seaward_simulation::LocalSimulation;
/// struct EmptySea;
///
/// impl LocalSimulation for EmptySea {
///     fn handle_message(&mut self, _player_id: &str, _message: &ClientMessage) {}
///
///     fn step(&mut self, _delta_time: f64) -> SyncFrame {
///         SyncFrame::default()
///     }
///
///     fn initialization(&self) -> InitializationFrame {
///         InitializationFrame::default()
///     }
///
///     fn players(&self) -> PlayersUpdate {
///         PlayersUpdate { players: Vec::new(), player_id: "local".into() }
///     }
/// }
/// ```
pub trait LocalSimulation: Send {
    /// Applies a message sent by the local player
    fn handle_message(&mut self, player_id: &str, message: &ClientMessage);

    /// Advances the simulation by `delta_time` seconds and reports the frame
    fn step(&mut self, delta_time: f64) -> SyncFrame;

    /// Full world dump used when the session starts
    fn initialization(&self) -> InitializationFrame;

    /// Player records and the id of the local player
    fn players(&self) -> PlayersUpdate;
}

/// Outgoing intent awaiting the router
#[derive(Debug, Clone, PartialEq)]
pub struct PendingIntent {
    /// Sequence number, increasing in submission order
    pub sequence: u64,

    pub intent: Intent,
}

/// FIFO of locally originated intents
///
/// Bounded so a stalled router cannot grow it without limit; when full the
/// oldest intent is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentQueue {
    intents: VecDeque<PendingIntent>,
    max_size: usize,
    next_sequence: u64,
}

impl IntentQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            intents: VecDeque::new(),
            max_size,
            next_sequence: 1,
        }
    }

    /// Queues an intent and returns its sequence number
    pub fn push(&mut self, intent: Intent) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        if self.intents.len() >= self.max_size {
            if let Some(dropped) = self.intents.pop_front() {
                tracing::warn!(sequence = dropped.sequence, "Intent queue full, dropping oldest");
            }
        }
        self.intents.push_back(PendingIntent { sequence, intent });
        sequence
    }

    /// Removes and returns all queued intents in submission order
    pub fn drain(&mut self) -> Vec<PendingIntent> {
        self.intents.drain(..).collect()
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingIntent> {
        self.intents.iter()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn clear(&mut self) {
        self.intents.clear();
    }
}

impl Default for IntentQueue {
    fn default() -> Self {
        Self::new(SyncConfig::default().max_pending_intents)
    }
}
