//! Unified error type for the Rollcall server.

use rollcall_protocol::ProtocolError;
use rollcall_registry::RegistryError;
use rollcall_session::SessionError;
use rollcall_transport::TransportError;

use crate::FixtureError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` variants let `?` lift sub-crate errors without any
/// mapping at the call site.
#[derive(Debug, thiserror::Error)]
pub enum RollcallError {
    /// Connection, send, or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encode, decode, or protocol violation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Authentication failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Round, directory, or store failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The fixture file couldn't be loaded.
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    /// Invalid server configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
