use thiserror::Error;

use crate::state::ConnectionState;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    #[error("Invalid envelope: {0}")]
    Invalid(String),

    #[error("Envelope has an empty event name")]
    MissingEvent,

    #[error("Envelope is not valid UTF-8")]
    NotUtf8,
}

pub type EnvelopeResult<T> = std::result::Result<T, EnvelopeError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("Codec error: {0}")]
    CodecError(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Invalid payload for {event}: {reason}")]
    InvalidPayload { event: String, reason: String },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
