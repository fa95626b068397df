//! Outgoing message router
//!
//! Callers hand every locally originated message to the router without
//! knowing whether a server or an in-process simulation consumes it.

use std::collections::VecDeque;

use seaward_protocol::{ClientMessage, Envelope};
use seaward_simulation::SyncConfig;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Where routed messages go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMode {
    /// Onto the transport session; buffered while disconnected
    Networked,

    /// Into a queue drained by the local simulation every tick
    Local,
}

/// What happened to a routed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Sent,
    Buffered,
    Local,
}

#[derive(Debug)]
pub struct OutgoingRouter {
    mode: RouteMode,
    link: Option<mpsc::Sender<Envelope>>,

    /// Networked messages waiting for a connection, oldest first
    pending: VecDeque<ClientMessage>,

    local: VecDeque<ClientMessage>,

    /// Bound of each queue; the oldest message is dropped when full
    max_queued: usize,
}

impl OutgoingRouter {
    pub fn new(mode: RouteMode) -> Self {
        Self::with_limit(mode, SyncConfig::default().max_pending_intents)
    }

    pub fn with_limit(mode: RouteMode, max_queued: usize) -> Self {
        Self {
            mode,
            link: None,
            pending: VecDeque::new(),
            local: VecDeque::new(),
            max_queued: max_queued.max(1),
        }
    }

    pub fn mode(&self) -> RouteMode {
        self.mode
    }

    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Routes a message according to the current mode
    ///
    /// Networked messages never overtake buffered ones.
    pub fn send_message(&mut self, message: ClientMessage) -> Routed {
        match self.mode {
            RouteMode::Local => {
                push_bounded(&mut self.local, message, self.max_queued);
                Routed::Local
            }
            RouteMode::Networked => {
                push_bounded(&mut self.pending, message, self.max_queued);
                self.flush();
                if self.pending.is_empty() {
                    Routed::Sent
                } else {
                    Routed::Buffered
                }
            }
        }
    }

    /// Connects the router to a live transport and flushes buffered messages
    pub fn attach(&mut self, link: mpsc::Sender<Envelope>) {
        self.link = Some(link);
        self.flush();
    }

    pub fn detach(&mut self) {
        self.link = None;
    }

    /// Sends buffered messages in FIFO order until the link is gone or full
    pub fn flush(&mut self) -> usize {
        let mut sent = 0;

        while let Some(message) = self.pending.front() {
            let Some(link) = &self.link else {
                break;
            };

            let envelope = match message.to_envelope() {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping unencodable message");
                    self.pending.pop_front();
                    continue;
                }
            };

            match link.try_send(envelope) {
                Ok(()) => {
                    self.pending.pop_front();
                    sent += 1;
                }
                Err(TrySendError::Full(_)) => break,
                Err(TrySendError::Closed(_)) => {
                    self.link = None;
                    break;
                }
            }
        }

        if sent > 0 {
            tracing::debug!(sent, remaining = self.pending.len(), "Flushed outgoing messages");
        }
        sent
    }

    /// Switches the destination; buffered networked messages are dropped
    /// when leaving networked mode
    pub fn set_mode(&mut self, mode: RouteMode) {
        if self.mode == mode {
            return;
        }
        if self.mode == RouteMode::Networked {
            self.discard();
        }
        self.mode = mode;
    }

    /// Drops every buffered message
    pub fn discard(&mut self) {
        let dropped = self.pending.len() + self.local.len();
        if dropped > 0 {
            tracing::info!(dropped, "Dropping queued outgoing messages");
        }
        self.pending.clear();
        self.local.clear();
        self.link = None;
    }

    /// Takes the messages queued for the local simulation
    pub fn drain_local(&mut self) -> Vec<ClientMessage> {
        self.local.drain(..).collect()
    }
}

fn push_bounded(queue: &mut VecDeque<ClientMessage>, message: ClientMessage, max: usize) {
    if queue.len() >= max {
        if let Some(dropped) = queue.pop_front() {
            tracing::warn!(event = dropped.event(), queued = queue.len(), "Outgoing queue full, dropping oldest");
        }
    }
    queue.push_back(message);
}
