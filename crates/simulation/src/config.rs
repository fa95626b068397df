use std::collections::HashSet;
use std::time::Duration;

use seaward_protocol::SoundType;

/// Tuning for the sync applier and render clock
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Great-circle distance in radians under which the local prediction of
    /// the controlled ship is kept over the server's position
    pub reconciliation_threshold: f64,

    /// Frame interval assumed until two frames have been measured
    pub default_frame_interval: Duration,

    /// Frames closer together than this do not update the measured interval
    pub min_reset_interval: Duration,

    /// Maximum number of queued outgoing intents
    pub max_pending_intents: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            // 100x the simulation's base physics scale
            reconciliation_threshold: 1e-4,
            default_frame_interval: Duration::from_millis(100),
            min_reset_interval: Duration::from_millis(10),
            max_pending_intents: 256,
        }
    }
}

/// Sound tracking configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SoundConfig {
    /// Sounds audible regardless of which ship emitted them
    pub global_sounds: HashSet<SoundType>,
}

impl SoundConfig {
    pub fn is_global(&self, sound_type: &SoundType) -> bool {
        self.global_sounds.contains(sound_type)
    }
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            global_sounds: ["impact", "shipSinking"]
                .into_iter()
                .map(SoundType::new)
                .collect(),
        }
    }
}
