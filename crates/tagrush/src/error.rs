//! Unified error type for the Tagrush server.

use tagrush_protocol::ProtocolError;
use tagrush_transport::TransportError;

use crate::config::ConfigError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attributes let `?` convert sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum TagrushError {
    /// Connection, send, or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The environment held an unusable setting.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: TagrushError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, TagrushError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error_keeps_message() {
        use tagrush_protocol::{ClientEnvelope, Codec, JsonCodec};

        let err: TagrushError = JsonCodec.decode::<ClientEnvelope>(b"{").unwrap_err().into();
        assert!(matches!(err, TagrushError::Protocol(ProtocolError::Decode(_))));
        assert!(err.to_string().starts_with("decode failed"));
    }

    #[test]
    fn test_from_config_error() {
        let err: TagrushError = ConfigError {
            key: "PORT",
            value: "x".into(),
        }
        .into();
        assert_eq!(err.to_string(), "invalid value for PORT: \"x\"");
    }
}
