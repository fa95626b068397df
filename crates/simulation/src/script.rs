//! Tick-driven scripted sequences
//!
//! A [`Script`] is a queue of steps. Each tick runs the front step once; a
//! step that returns [`StepStatus::Pending`] is retried next tick, one that
//! returns [`StepStatus::Done`] is dropped and the following step runs on
//! the next tick.

use std::collections::VecDeque;

use seaward_protocol::Intent;

use crate::world::WorldMirror;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Pending,
}

/// What a step may look at and do during a tick
pub struct ScriptContext<'a> {
    pub world: &'a WorldMirror,

    /// Intents to send as if the player had issued them
    pub intents: &'a mut Vec<Intent>,

    /// Text shown to the player; `None` hides the prompt
    pub prompt: &'a mut Option<String>,
}

pub type Step = Box<dyn FnMut(&mut ScriptContext<'_>) -> StepStatus + Send>;

/// Ordered steps run one tick at a time
///
/// # Example
///
/// ```rust
/// use seaward_protocol::Intent;
/// use seaward_simulation::{Script, ScriptContext, StepStatus, WorldMirror};
///
/// let mut script = Script::new()
///     .then(|ctx| {
///         *ctx.prompt = Some("Press space to fire".into());
///         StepStatus::Done
///     })
///     .wait_ticks(2)
///     .then(|ctx| {
///         ctx.intents.push(Intent::Fire);
///         StepStatus::Done
///     });
///
/// let world = WorldMirror::default();
/// let mut intents = Vec::new();
/// let mut prompt = None;
/// let mut ticks = 0;
/// while !script.is_finished() {
///     let mut ctx = ScriptContext { world: &world, intents: &mut intents, prompt: &mut prompt };
///     script.tick(&mut ctx);
///     ticks += 1;
/// }
///
/// assert_eq!(ticks, 4);
/// assert_eq!(intents, vec![Intent::Fire]);
/// ```
#[derive(Default)]
pub struct Script {
    steps: VecDeque<Step>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step
    pub fn then<F>(mut self, step: F) -> Self
    where
        F: FnMut(&mut ScriptContext<'_>) -> StepStatus + Send + 'static,
    {
        self.steps.push_back(Box::new(step));
        self
    }

    /// Appends a step that stays pending for `ticks` ticks
    pub fn wait_ticks(self, ticks: u32) -> Self {
        let mut remaining = ticks;
        self.then(move |_| {
            if remaining == 0 {
                return StepStatus::Done;
            }
            remaining -= 1;
            if remaining == 0 {
                StepStatus::Done
            } else {
                StepStatus::Pending
            }
        })
    }

    /// Runs the current step once; returns true when the script is finished
    pub fn tick(&mut self, ctx: &mut ScriptContext<'_>) -> bool {
        if let Some(step) = self.steps.front_mut() {
            if step(ctx) == StepStatus::Done {
                self.steps.pop_front();
                tracing::debug!(remaining = self.steps.len(), "Script step finished");
            }
        }
        self.steps.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl std::fmt::Debug for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Script")
            .field("steps", &self.steps.len())
            .finish()
    }
}
