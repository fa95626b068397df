//! Typed messages exchanged with the game server
//!
//! Every message travels as an [`Envelope`]. Event names are fixed strings
//! (see [`events`]); decoding maps them onto closed enums so dispatch is an
//! exhaustive `match` rather than a lookup table.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{Codec, JsonCodec};
use crate::envelope::Envelope;
use crate::error::{ProtocolError, Result};
use crate::model::{
    InitializationFrame, Intent, MenuOption, PlayersUpdate, ShardPort, SimulationEvent, SyncFrame,
};

/// Event names used on the wire
pub mod events {
    /// Client → Server: log in with a display name
    pub const JOIN_GAME: &str = "join-game";

    /// Client → Server: request a full world dump
    pub const GET_WORLD: &str = "get-world";

    /// Client → Server: ready to receive per-tick frames
    pub const INIT_LOOP: &str = "init-loop";

    /// Client → Server: flow-control hint sent for every frame
    pub const ACK: &str = "ack";

    /// Both directions: simulation intent or event
    pub const GENERIC_MESSAGE: &str = "generic-message";

    /// Server → Client: full initialization frame
    pub const SEND_WORLD: &str = "send-world";

    /// Server → Client: incremental sync frame
    pub const SEND_FRAME: &str = "send-frame";

    /// Server → Client: player records and the local player id
    pub const SEND_PLAYERS: &str = "send-players";

    pub const SEND_SPAWN_FACTIONS: &str = "send-spawn-factions";
    pub const SEND_SPAWN_PLANETS: &str = "send-spawn-planets";
    pub const SEND_SPAWN_LOCATIONS: &str = "send-spawn-locations";

    /// Server → Client: move to a sharded endpoint
    pub const SHARD_PORT_NUMBER: &str = "shard-port-number";
}

/// Payload of every `ack` message
pub const ACK_PAYLOAD: &str = "ACK";

/// Payload of `join-game`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGame {
    pub name: String,
}

/// Messages the client sends
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    JoinGame(JoinGame),
    GetWorld,
    InitLoop,
    Ack,
    Generic(Intent),
}

impl ClientMessage {
    pub fn join(name: impl Into<String>) -> Self {
        ClientMessage::JoinGame(JoinGame { name: name.into() })
    }

    /// Returns the wire event name
    pub fn event(&self) -> &'static str {
        match self {
            ClientMessage::JoinGame(_) => events::JOIN_GAME,
            ClientMessage::GetWorld => events::GET_WORLD,
            ClientMessage::InitLoop => events::INIT_LOOP,
            ClientMessage::Ack => events::ACK,
            ClientMessage::Generic(_) => events::GENERIC_MESSAGE,
        }
    }

    pub fn to_envelope(&self) -> Result<Envelope> {
        let message = match self {
            ClientMessage::JoinGame(join) => JsonCodec.to_value(join)?,
            ClientMessage::GetWorld | ClientMessage::InitLoop => Value::Null,
            ClientMessage::Ack => Value::String(ACK_PAYLOAD.to_string()),
            ClientMessage::Generic(intent) => JsonCodec.to_value(intent)?,
        };
        Ok(Envelope::new(self.event(), message))
    }

    /// Decodes a client message; used by in-process servers and tests
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        match envelope.event.as_str() {
            events::JOIN_GAME => Ok(ClientMessage::JoinGame(payload(envelope)?)),
            events::GET_WORLD => Ok(ClientMessage::GetWorld),
            events::INIT_LOOP => Ok(ClientMessage::InitLoop),
            events::ACK => Ok(ClientMessage::Ack),
            events::GENERIC_MESSAGE => Ok(ClientMessage::Generic(payload(envelope)?)),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }
}

/// Messages the server sends
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    SendWorld(InitializationFrame),
    SendFrame(SyncFrame),
    SendPlayers(PlayersUpdate),
    SendSpawnFactions(Vec<MenuOption>),
    SendSpawnPlanets(Vec<MenuOption>),
    SendSpawnLocations(Vec<MenuOption>),
    ShardPortNumber(ShardPort),
    Generic(SimulationEvent),
}

impl ServerMessage {
    /// Returns the wire event name
    pub fn event(&self) -> &'static str {
        match self {
            ServerMessage::SendWorld(_) => events::SEND_WORLD,
            ServerMessage::SendFrame(_) => events::SEND_FRAME,
            ServerMessage::SendPlayers(_) => events::SEND_PLAYERS,
            ServerMessage::SendSpawnFactions(_) => events::SEND_SPAWN_FACTIONS,
            ServerMessage::SendSpawnPlanets(_) => events::SEND_SPAWN_PLANETS,
            ServerMessage::SendSpawnLocations(_) => events::SEND_SPAWN_LOCATIONS,
            ServerMessage::ShardPortNumber(_) => events::SHARD_PORT_NUMBER,
            ServerMessage::Generic(_) => events::GENERIC_MESSAGE,
        }
    }

    /// Decodes a server message from its envelope
    ///
    /// Unknown event names and payloads that do not match the expected shape
    /// are errors; callers drop such messages.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        match envelope.event.as_str() {
            events::SEND_WORLD => Ok(ServerMessage::SendWorld(payload(envelope)?)),
            events::SEND_FRAME => Ok(ServerMessage::SendFrame(payload(envelope)?)),
            events::SEND_PLAYERS => Ok(ServerMessage::SendPlayers(payload(envelope)?)),
            events::SEND_SPAWN_FACTIONS => Ok(ServerMessage::SendSpawnFactions(payload(envelope)?)),
            events::SEND_SPAWN_PLANETS => Ok(ServerMessage::SendSpawnPlanets(payload(envelope)?)),
            events::SEND_SPAWN_LOCATIONS => {
                Ok(ServerMessage::SendSpawnLocations(payload(envelope)?))
            }
            events::SHARD_PORT_NUMBER => Ok(ServerMessage::ShardPortNumber(payload(envelope)?)),
            events::GENERIC_MESSAGE => Ok(ServerMessage::Generic(payload(envelope)?)),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// Encodes the message; used by in-process servers and tests
    pub fn to_envelope(&self) -> Result<Envelope> {
        let message = match self {
            ServerMessage::SendWorld(frame) => JsonCodec.to_value(frame)?,
            ServerMessage::SendFrame(frame) => JsonCodec.to_value(frame)?,
            ServerMessage::SendPlayers(update) => JsonCodec.to_value(update)?,
            ServerMessage::SendSpawnFactions(options)
            | ServerMessage::SendSpawnPlanets(options)
            | ServerMessage::SendSpawnLocations(options) => JsonCodec.to_value(options)?,
            ServerMessage::ShardPortNumber(shard) => JsonCodec.to_value(shard)?,
            ServerMessage::Generic(event) => JsonCodec.to_value(event)?,
        };
        Ok(Envelope::new(self.event(), message))
    }
}

fn payload<T: DeserializeOwned>(envelope: &Envelope) -> Result<T> {
    JsonCodec
        .from_value(envelope.message.clone())
        .map_err(|e| ProtocolError::InvalidPayload {
            event: envelope.event.clone(),
            reason: e.to_string(),
        })
}
