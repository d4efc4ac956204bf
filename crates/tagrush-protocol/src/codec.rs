//! Codec trait and the JSON implementation.
//!
//! The server never touches `serde_json` directly; it holds something
//! that implements [`Codec`] and calls `encode`/`decode`. Swapping the
//! wire format means adding another implementation here.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts wire types to bytes and back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the life of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// JSON is what browser clients speak natively, and every frame it
/// produces is valid UTF-8, so the transport can send it as a text frame.
///
/// ```rust
/// use tagrush_protocol::{ClientEnvelope, ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let bytes = codec
///     .encode(&ClientEnvelope::new(ClientMessage::Moved { x: 8.0, y: 8.0 }))
///     .unwrap();
/// let back: ClientEnvelope = codec.decode(&bytes).unwrap();
/// assert_eq!(back.message, ClientMessage::Moved { x: 8.0, y: 8.0 });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
