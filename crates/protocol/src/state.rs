//! Connection state machine for the transport session
//!
//! State transitions:
//! ```text
//! CLOSED → DISCOVERING → CONNECTING → OPEN → INITIALIZED
//!   ↑  ↘                    ↑  ↓        ↓         ↓
//!   │   RECONNECTING ───────┘  │        │         │
//!   └──────────────────────────┴────────┴─────────┘
//!                    (close, failure, mode switch)
//! ```

use crate::error::{ProtocolError, Result};

/// Connection state of a transport session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection and nothing scheduled
    #[default]
    Closed,

    /// Resolving the endpoint through the matchmaker
    Discovering,

    /// Transport is being established
    Connecting,

    /// Transport is open, world not received yet
    Open,

    /// Initialization frame applied, per-tick frames flowing
    Initialized,

    /// Waiting for the reconnect delay to elapse
    Reconnecting,
}

impl ConnectionState {
    /// Validates a state transition
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        match (self, next) {
            (Closed, Discovering) => true,
            (Closed, Connecting) => true,
            (Closed, Reconnecting) => true,

            (Discovering, Connecting) => true,
            (Discovering, Closed) => true, // matchmaking failed

            (Connecting, Open) => true,
            (Connecting, Closed) => true, // connect failed

            (Open, Initialized) => true,
            (Open, Connecting) => true, // shard reroute
            (Open, Closed) => true,

            (Initialized, Connecting) => true, // shard reroute
            (Initialized, Closed) => true,

            (Reconnecting, Connecting) => true,
            (Reconnecting, Closed) => true, // cancelled

            (a, b) if a == &b => true,

            _ => false,
        }
    }

    /// Attempts to transition to a new state
    pub fn transition_to(&mut self, next: ConnectionState) -> Result<()> {
        if self.can_transition_to(next) {
            *self = next;
            Ok(())
        } else {
            Err(ProtocolError::InvalidStateTransition {
                from: *self,
                to: next,
            })
        }
    }

    /// Returns true while a transport is open
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::Initialized)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        matches!(self, ConnectionState::Initialized)
    }

    #[inline]
    pub fn is_reconnecting(&self) -> bool {
        matches!(self, ConnectionState::Reconnecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Closed => write!(f, "Closed"),
            ConnectionState::Discovering => write!(f, "Discovering"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Initialized => write!(f, "Initialized"),
            ConnectionState::Reconnecting => write!(f, "Reconnecting"),
        }
    }
}
