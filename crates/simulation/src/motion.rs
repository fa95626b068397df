//! Predictive motion stepping between server frames
//!
//! Every render tick each moving entity advances by its velocity raised to
//! `delta = (now - last_render) / frame_interval`, where `frame_interval` is
//! the measured time between recent server frames. Because velocity powers
//! compose additively, the trajectory does not depend on the render rate.

use std::time::{Duration, Instant};

use crate::quat::SphereQuat;
use crate::world::WorldMirror;

/// Render timing shared by the sync applier and the stepper
#[derive(Debug, Clone, PartialEq)]
pub struct RenderClock {
    default_interval: Duration,
    min_reset_interval: Duration,
    frame_interval: Duration,
    last_reset: Option<Instant>,
    last_render: Option<Instant>,
}

impl RenderClock {
    pub fn new(default_interval: Duration, min_reset_interval: Duration) -> Self {
        Self {
            default_interval,
            min_reset_interval,
            frame_interval: default_interval,
            last_reset: None,
            last_render: None,
        }
    }

    /// Measured time between the two most recent accepted frames
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn last_render(&self) -> Option<Instant> {
        self.last_render
    }

    /// Starts timing from `now` without measuring an interval
    pub(crate) fn restart(&mut self, now: Instant) {
        self.last_reset = Some(now);
        self.last_render = Some(now);
    }

    /// Records the arrival of fresh authoritative state at `now`
    ///
    /// Returns true if the interval since the previous accepted reset was
    /// long enough to become the new frame interval. Shorter gaps only move
    /// the render time, so bursts of frames cannot collapse the interval.
    pub(crate) fn reset(&mut self, now: Instant) -> bool {
        self.last_render = Some(now);

        let Some(previous) = self.last_reset else {
            self.last_reset = Some(now);
            return false;
        };

        let elapsed = now.saturating_duration_since(previous);
        if elapsed < self.min_reset_interval {
            return false;
        }

        self.frame_interval = elapsed;
        self.last_reset = Some(now);
        true
    }

    /// Returns the fraction of a frame elapsed since the last render and
    /// moves the render time to `now`
    pub(crate) fn advance(&mut self, now: Instant) -> f64 {
        let delta = match self.last_render {
            Some(previous) if !self.frame_interval.is_zero() => {
                now.saturating_duration_since(previous).as_secs_f64()
                    / self.frame_interval.as_secs_f64()
            }
            _ => 0.0,
        };
        self.last_render = Some(now);
        delta
    }

    pub(crate) fn clear(&mut self) {
        self.frame_interval = self.default_interval;
        self.last_reset = None;
        self.last_render = None;
    }
}

impl Default for RenderClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_millis(10))
    }
}

/// Spherical dead reckoning for every moving entity
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionStepper;

impl MotionStepper {
    pub fn new() -> Self {
        Self
    }

    /// Advances the world to `now` and returns the frame fraction applied
    pub fn step(&self, world: &mut WorldMirror, now: Instant) -> f64 {
        let delta = world.clock.advance(now);
        self.advance_by(world, delta);
        delta
    }

    /// Advances every moving entity by `delta` frames
    pub fn advance_by(&self, world: &mut WorldMirror, delta: f64) {
        if delta <= 0.0 || !delta.is_finite() {
            return;
        }

        for entity in world.moving_entities_mut() {
            entity.position = entity.position.compose(entity.position_velocity.pow(delta));
            entity.orientation = entity
                .orientation
                .compose(entity.orientation_velocity.pow(delta));
        }
    }
}
