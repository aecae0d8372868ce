//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The server never cares HOW envelopes become bytes. It only needs
//! something that implements [`Codec`]. [`JsonCodec`] is the one we ship:
//! attendance clients are mobile apps and browsers, and JSON is what
//! they speak natively.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a single codec instance is shared by
/// every connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use rollcall_protocol::{ClassroomId, Codec, Envelope, JsonCodec, Request};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::new(
///     1,
///     0,
///     Request::SessionStatus { classroom_id: ClassroomId(7) },
/// );
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope<Request> = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
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

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClassroomId, Envelope, Request};

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<Envelope<Request>, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_produces_utf8_json() {
        let envelope = Envelope::new(3, 0, Request::ListActive);
        let bytes = JsonCodec.encode(&envelope).unwrap();
        let text = std::str::from_utf8(&bytes).expect("json is utf-8");
        assert!(text.contains("\"ListActive\""));
    }

    #[test]
    fn test_decode_accepts_hand_written_client_json() {
        // What a mobile client actually sends.
        let raw = br#"{"seq":4,"timestamp":0,"payload":
            {"type":"PassToken","classroom_id":2,"from":"S-1","to":"S-2"}}"#;
        let envelope: Envelope<Request> = JsonCodec.decode(raw).unwrap();
        assert_eq!(envelope.seq, 4);
        assert_eq!(
            envelope.payload,
            Request::PassToken {
                classroom_id: ClassroomId(2),
                from: "S-1".into(),
                to: "S-2".into(),
            }
        );
    }
}
