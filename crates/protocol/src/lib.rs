//! # Seaward Protocol
//!
//! Wire format and data model shared by the seaward client crates.
//!
//! This crate provides:
//! - `Envelope`: the `{event, message}` JSON envelope used for every message
//! - `ClientMessage` / `ServerMessage`: typed messages keyed by event name
//! - The world data model: entities, frames, players, sound events, intents
//! - `ConnectionState`: transport session state machine
//! - `Transport`: the transport abstraction implemented by the client crate
//!
//! ## Example
//!
//! ```
//! use seaward_protocol::{ClientMessage, Envelope, ServerMessage};
//!
//! let envelope = ClientMessage::join("Ann").to_envelope().unwrap();
//! assert_eq!(envelope.to_text(), r#"{"event":"join-game","message":{"name":"Ann"}}"#);
//!
//! let inbound = Envelope::from_text(r#"{"event":"send-frame","message":{}}"#).unwrap();
//! assert!(matches!(
//!     ServerMessage::from_envelope(&inbound),
//!     Ok(ServerMessage::SendFrame(_))
//! ));
//! ```

pub mod codec;
pub mod envelope;
pub mod error;
pub mod messages;
pub mod model;
pub mod state;
pub mod transport;

pub use codec::{Codec, JsonCodec};
pub use envelope::Envelope;
pub use error::{EnvelopeError, ProtocolError, Result};
pub use messages::{events, ClientMessage, JoinGame, ServerMessage, ACK_PAYLOAD};
pub use model::{
    EntityId, EntityKind, EntityState, FactionRecord, InitializationFrame, Intent, KindDelta,
    MenuOption, PlayerRecord, PlayersUpdate, ShardPort, SimulationEvent, SoundEvent,
    SoundEventKind, SoundType, SyncFrame,
};
pub use state::ConnectionState;
pub use transport::{Transport, TransportEvent};
