//! Sound bookkeeping for simulation events
//!
//! One-off events play once when they first appear in the event log. A
//! one-off appended between frames and carried into the next frame is only
//! skipped there if an earlier pass actually played it.
//! Continuous events keep a looping playback alive for as long as some pass
//! keeps seeing them; a render pass that no longer sees a key stops it.

use std::collections::{HashMap, HashSet};

use seaward_protocol::{EntityId, SoundEventKind, SoundType};

use crate::world::WorldMirror;
use crate::SoundConfig;

/// Opaque handle to a looping playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(pub u64);

/// Audio backend driven by the [`SoundTracker`]
pub trait SoundPlayer: Send {
    /// Whether the sample for `sound_type` is ready to play
    fn is_loaded(&self, sound_type: &SoundType) -> bool;

    fn play_once(&mut self, ship_id: &str, sound_type: &SoundType);

    /// Starts a loop; `None` if the backend could not start it
    fn start_loop(&mut self, ship_id: &str, sound_type: &SoundType) -> Option<PlaybackHandle>;

    fn stop(&mut self, handle: PlaybackHandle);
}

/// Player that accepts everything and plays nothing
#[derive(Debug, Default)]
pub struct NullSoundPlayer {
    next_handle: u64,
}

impl SoundPlayer for NullSoundPlayer {
    fn is_loaded(&self, _sound_type: &SoundType) -> bool {
        true
    }

    fn play_once(&mut self, _ship_id: &str, _sound_type: &SoundType) {}

    fn start_loop(&mut self, _ship_id: &str, _sound_type: &SoundType) -> Option<PlaybackHandle> {
        self.next_handle += 1;
        Some(PlaybackHandle(self.next_handle))
    }

    fn stop(&mut self, _handle: PlaybackHandle) {}
}

/// Origin of a tracker pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSource {
    /// Render loop; may stop sounds that disappeared
    Render,

    /// Right after a sync frame was applied; never stops sounds
    Reconcile,
}

/// What one pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoundPass {
    pub played: usize,
    pub started: usize,
    pub stopped: usize,
}

type SoundKey = (EntityId, SoundType);

pub struct SoundTracker {
    config: SoundConfig,
    player: Box<dyn SoundPlayer>,
    active: HashMap<SoundKey, PlaybackHandle>,

    /// Event log batch the one-off cursor belongs to
    last_batch: Option<u64>,
    /// Entries of `last_batch` whose one-offs were already handled
    consumed: usize,

    /// One-offs played from the appended part of `last_batch`
    announced: Vec<SoundKey>,

    /// `announced` of the previous batch, matched against carried entries
    carried_announced: Vec<SoundKey>,
}

impl SoundTracker {
    pub fn new(config: SoundConfig, player: Box<dyn SoundPlayer>) -> Self {
        Self {
            config,
            player,
            active: HashMap::new(),
            last_batch: None,
            consumed: 0,
            announced: Vec::new(),
            carried_announced: Vec::new(),
        }
    }

    /// Plays new one-offs and reconciles looping sounds with the event log
    pub fn process(&mut self, world: &WorldMirror, source: TickSource) -> SoundPass {
        let mut pass = SoundPass::default();
        let log = world.event_log();

        if self.last_batch != Some(log.batch()) {
            self.last_batch = Some(log.batch());
            self.consumed = 0;
            self.carried_announced = std::mem::take(&mut self.announced);
        }

        let controlled_id = world.controlled_entity_id();
        let mut seen: HashSet<SoundKey> = HashSet::new();

        for (index, entry) in log.entries().iter().enumerate() {
            let Some(sound) = entry.event.as_sound() else {
                continue;
            };
            let audible = controlled_id == Some(sound.ship_id.as_str())
                || self.config.is_global(&sound.sound_type);
            if !audible {
                continue;
            }

            match sound.event_kind {
                SoundEventKind::OneOff => {
                    if index < self.consumed {
                        continue;
                    }
                    let key = (sound.ship_id.clone(), sound.sound_type.clone());
                    if entry.carried {
                        if let Some(position) =
                            self.carried_announced.iter().position(|played| *played == key)
                        {
                            self.carried_announced.swap_remove(position);
                            continue;
                        }
                    }
                    if self.player.is_loaded(&sound.sound_type) {
                        self.player.play_once(&sound.ship_id, &sound.sound_type);
                        pass.played += 1;
                        if index >= log.frame_len() {
                            self.announced.push(key);
                        }
                    }
                }
                SoundEventKind::Continuous => {
                    let key = (sound.ship_id.clone(), sound.sound_type.clone());
                    if !self.active.contains_key(&key) {
                        if let Some(handle) =
                            self.player.start_loop(&sound.ship_id, &sound.sound_type)
                        {
                            tracing::trace!(ship = %sound.ship_id, sound = %sound.sound_type, "Started loop");
                            self.active.insert(key.clone(), handle);
                            pass.started += 1;
                        }
                    }
                    seen.insert(key);
                }
            }
        }
        self.consumed = log.len();

        if source == TickSource::Render {
            let gone: Vec<SoundKey> = self
                .active
                .keys()
                .filter(|key| !seen.contains(*key))
                .cloned()
                .collect();
            for key in gone {
                if let Some(handle) = self.active.remove(&key) {
                    tracing::trace!(ship = %key.0, sound = %key.1, "Stopped loop");
                    self.player.stop(handle);
                    pass.stopped += 1;
                }
            }
        }

        pass
    }

    /// Stops every looping sound
    pub fn stop_all(&mut self) {
        for (_, handle) in self.active.drain() {
            self.player.stop(handle);
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_playing(&self, ship_id: &str, sound_type: &SoundType) -> bool {
        self.active
            .contains_key(&(ship_id.to_string(), sound_type.clone()))
    }
}

impl Default for SoundTracker {
    fn default() -> Self {
        Self::new(SoundConfig::default(), Box::new(NullSoundPlayer::default()))
    }
}

impl std::fmt::Debug for SoundTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundTracker")
            .field("active", &self.active)
            .field("last_batch", &self.last_batch)
            .field("consumed", &self.consumed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyncApplier;
    use seaward_protocol::{
        EntityState, InitializationFrame, PlayerRecord, SimulationEvent, SoundEvent, SyncFrame,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Play(String),
        Start(String),
        Stop(u64),
    }

    #[derive(Default, Clone)]
    struct RecordingPlayer {
        calls: Arc<Mutex<Vec<Call>>>,
        next: u64,
    }

    impl SoundPlayer for RecordingPlayer {
        fn is_loaded(&self, sound_type: &SoundType) -> bool {
            sound_type.as_str() != "unloaded"
        }

        fn play_once(&mut self, _ship_id: &str, sound_type: &SoundType) {
            self.calls.lock().unwrap().push(Call::Play(sound_type.to_string()));
        }

        fn start_loop(&mut self, _ship_id: &str, sound_type: &SoundType) -> Option<PlaybackHandle> {
            self.next += 1;
            self.calls.lock().unwrap().push(Call::Start(sound_type.to_string()));
            Some(PlaybackHandle(self.next))
        }

        fn stop(&mut self, handle: PlaybackHandle) {
            self.calls.lock().unwrap().push(Call::Stop(handle.0));
        }
    }

    fn setup() -> (SoundTracker, Arc<Mutex<Vec<Call>>>, SyncApplier, WorldMirror) {
        let player = RecordingPlayer::default();
        let calls = player.calls.clone();
        let tracker = SoundTracker::new(SoundConfig::default(), Box::new(player));

        let applier = SyncApplier::default();
        let mut world = WorldMirror::default();
        applier.apply_initialization(
            &mut world,
            InitializationFrame {
                ships: vec![EntityState::new("ship-42"), EntityState::new("ship-7")],
                players: vec![PlayerRecord::new("p1").controlling("ship-42")],
                player_id: Some("p1".into()),
                ..Default::default()
            },
            Instant::now(),
        );
        (tracker, calls, applier, world)
    }

    fn frame(events: Vec<SimulationEvent>) -> SyncFrame {
        SyncFrame {
            events,
            ..Default::default()
        }
    }

    fn sound(event: SoundEvent) -> SimulationEvent {
        SimulationEvent::Sound(event)
    }

    #[test]
    fn test_continuous_starts_once_and_stops_once() {
        let (mut tracker, calls, applier, mut world) = setup();
        let sailing = sound(SoundEvent::continuous("ship-42", "sailing"));

        for _ in 0..5 {
            applier.apply_sync(&mut world, frame(vec![sailing.clone()]), Instant::now());
            tracker.process(&world, TickSource::Reconcile);
            tracker.process(&world, TickSource::Render);
            tracker.process(&world, TickSource::Render);
        }
        applier.apply_sync(&mut world, frame(Vec::new()), Instant::now());
        tracker.process(&world, TickSource::Reconcile);
        tracker.process(&world, TickSource::Render);
        tracker.process(&world, TickSource::Render);

        let calls = calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![Call::Start("sailing".into()), Call::Stop(1)]
        );
    }

    #[test]
    fn test_reconcile_pass_never_stops() {
        let (mut tracker, _, applier, mut world) = setup();
        let sailing = sound(SoundEvent::continuous("ship-7", "impact"));

        applier.apply_sync(&mut world, frame(vec![sailing]), Instant::now());
        tracker.process(&world, TickSource::Render);
        assert_eq!(tracker.active_count(), 1);

        applier.apply_sync(&mut world, frame(Vec::new()), Instant::now());
        let pass = tracker.process(&world, TickSource::Reconcile);
        assert_eq!(pass.stopped, 0);
        assert!(tracker.is_playing("ship-7", &SoundType::new("impact")));

        let pass = tracker.process(&world, TickSource::Render);
        assert_eq!(pass.stopped, 1);
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn test_one_off_plays_once_per_frame() {
        let (mut tracker, calls, applier, mut world) = setup();
        let fire = sound(SoundEvent::one_off("ship-42", "cannonFire"));

        applier.apply_sync(&mut world, frame(vec![fire.clone()]), Instant::now());
        assert_eq!(tracker.process(&world, TickSource::Reconcile).played, 1);
        assert_eq!(tracker.process(&world, TickSource::Render).played, 0);

        applier.apply_event(&mut world, fire);
        assert_eq!(tracker.process(&world, TickSource::Render).played, 1);

        // The appended event is carried into the next frame but must not replay
        applier.apply_sync(&mut world, frame(Vec::new()), Instant::now());
        assert_eq!(world.event_log().len(), 1);
        assert_eq!(tracker.process(&world, TickSource::Render).played, 0);

        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_one_off_appended_before_frame_plays_once() {
        let (mut tracker, calls, applier, mut world) = setup();

        // No pass runs between the event and the next frame
        applier.apply_event(&mut world, sound(SoundEvent::one_off("ship-42", "cannonFire")));
        applier.apply_sync(&mut world, frame(Vec::new()), Instant::now());

        assert_eq!(tracker.process(&world, TickSource::Reconcile).played, 1);
        assert_eq!(tracker.process(&world, TickSource::Render).played, 0);
        assert_eq!(*calls.lock().unwrap(), vec![Call::Play("cannonFire".into())]);
    }

    #[test]
    fn test_global_one_off_appended_before_frame_plays_once() {
        let (mut tracker, calls, applier, mut world) = setup();

        applier.apply_event(&mut world, sound(SoundEvent::one_off("ship-7", "shipSinking")));
        applier.apply_sync(&mut world, frame(Vec::new()), Instant::now());

        assert_eq!(tracker.process(&world, TickSource::Reconcile).played, 1);
        assert_eq!(tracker.process(&world, TickSource::Render).played, 0);

        applier.apply_sync(&mut world, frame(Vec::new()), Instant::now());
        assert_eq!(tracker.process(&world, TickSource::Render).played, 0);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_repeated_one_off_is_not_swallowed() {
        let (mut tracker, calls, applier, mut world) = setup();
        let fire = sound(SoundEvent::one_off("ship-42", "cannonFire"));

        // First shot heard between frames, second one arrives right before
        // the frame
        applier.apply_event(&mut world, fire.clone());
        assert_eq!(tracker.process(&world, TickSource::Render).played, 1);
        applier.apply_sync(&mut world, frame(Vec::new()), Instant::now());
        assert_eq!(tracker.process(&world, TickSource::Render).played, 0);

        applier.apply_event(&mut world, fire);
        applier.apply_sync(&mut world, frame(Vec::new()), Instant::now());
        assert_eq!(tracker.process(&world, TickSource::Reconcile).played, 1);

        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_inaudible_and_unloaded_sounds_are_skipped() {
        let (mut tracker, calls, applier, mut world) = setup();
        let events = vec![
            sound(SoundEvent::one_off("ship-7", "cannonFire")),
            sound(SoundEvent::continuous("ship-7", "sailing")),
            sound(SoundEvent::one_off("ship-42", "unloaded")),
        ];

        applier.apply_sync(&mut world, frame(events), Instant::now());
        let pass = tracker.process(&world, TickSource::Render);

        assert_eq!(pass, SoundPass::default());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_global_sound_from_other_ship_plays() {
        let (mut tracker, _, applier, mut world) = setup();

        applier.apply_sync(
            &mut world,
            frame(vec![sound(SoundEvent::one_off("ship-7", "shipSinking"))]),
            Instant::now(),
        );

        assert_eq!(tracker.process(&world, TickSource::Render).played, 1);
    }

    #[test]
    fn test_stop_all() {
        let (mut tracker, calls, applier, mut world) = setup();
        applier.apply_sync(
            &mut world,
            frame(vec![sound(SoundEvent::continuous("ship-42", "sailing"))]),
            Instant::now(),
        );
        tracker.process(&world, TickSource::Render);

        tracker.stop_all();

        assert_eq!(tracker.active_count(), 0);
        assert_eq!(calls.lock().unwrap().last(), Some(&Call::Stop(1)));
    }
}
