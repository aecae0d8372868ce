//! Error types for the protocol layer.
//!
//! Each crate in Rollcall owns its own error enum, so a
//! `ProtocolError` always means the problem is in serialization or
//! message shape, never in networking or session state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, an
    /// unknown `type` tag, or a truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but breaks protocol rules, e.g. a
    /// request sent before the handshake or a version mismatch.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
