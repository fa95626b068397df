//! Codec abstraction for envelope and payload serialization
//!
//! The wire format is JSON text. The [`Codec`] trait keeps the transports
//! independent of the concrete serializer.
//!
//! ```
//! use seaward_protocol::codec::{Codec, JsonCodec};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Login {
//!     name: String,
//! }
//!
//! let codec = JsonCodec;
//! let text = codec.encode(&Login { name: "Ann".into() }).unwrap();
//! let decoded: Login = codec.decode(&text).unwrap();
//! assert_eq!(decoded.name, "Ann");
//! ```

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, Result};

/// Codec trait for text payloads
///
/// Implementations must be thread-safe as transports run on their own tasks.
pub trait Codec: Send + Sync {
    /// Returns a human-readable name for this codec
    fn name(&self) -> &'static str;

    /// Encodes a serializable value into text
    fn encode<T: Serialize>(&self, message: &T) -> Result<String>;

    /// Decodes text into a deserializable value
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T>;

    /// Converts a value into the codec's dynamic representation
    fn to_value<T: Serialize>(&self, message: &T) -> Result<Value>;

    /// Converts the codec's dynamic representation into a typed value
    fn from_value<T: DeserializeOwned>(&self, value: Value) -> Result<T>;
}

/// JSON codec backed by serde_json
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "JSON"
    }

    fn encode<T: Serialize>(&self, message: &T) -> Result<String> {
        serde_json::to_string(message)
            .map_err(|e| ProtocolError::CodecError(format!("JSON encode failed: {}", e)))
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T> {
        serde_json::from_str(text)
            .map_err(|e| ProtocolError::CodecError(format!("JSON decode failed: {}", e)))
    }

    fn to_value<T: Serialize>(&self, message: &T) -> Result<Value> {
        serde_json::to_value(message)
            .map_err(|e| ProtocolError::CodecError(format!("JSON encode failed: {}", e)))
    }

    fn from_value<T: DeserializeOwned>(&self, value: Value) -> Result<T> {
        serde_json::from_value(value)
            .map_err(|e| ProtocolError::CodecError(format!("JSON decode failed: {}", e)))
    }
}
