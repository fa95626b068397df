use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{Codec, JsonCodec};
use crate::error::{EnvelopeError, EnvelopeResult as Result};

/// Network message envelope
///
/// Every message in both directions is a JSON object with an event name and
/// an arbitrary payload:
///
/// ```text
/// { "event": "send-frame", "message": { ... } }
/// ```
///
/// A missing `message` field decodes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name used for dispatch
    pub event: String,

    /// Event payload
    #[serde(default)]
    pub message: Value,
}

impl Envelope {
    /// Creates a new envelope
    pub fn new(event: impl Into<String>, message: Value) -> Self {
        Self {
            event: event.into(),
            message,
        }
    }

    /// Creates an envelope without payload
    pub fn empty(event: impl Into<String>) -> Self {
        Self::new(event, Value::Null)
    }

    /// Serializes the envelope into its JSON text form
    pub fn to_text(&self) -> String {
        // A struct of a String and a Value always serializes.
        JsonCodec.encode(self).unwrap_or_default()
    }

    /// Parses an envelope from JSON text
    pub fn from_text(text: &str) -> Result<Self> {
        let envelope: Envelope = JsonCodec
            .decode(text)
            .map_err(|e| EnvelopeError::Invalid(e.to_string()))?;

        if envelope.event.is_empty() {
            return Err(EnvelopeError::MissingEvent);
        }

        Ok(envelope)
    }

    /// Parses an envelope from a binary frame holding UTF-8 JSON
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| EnvelopeError::NotUtf8)?;
        Self::from_text(text)
    }
}
