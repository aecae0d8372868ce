//! Wire protocol for Rollcall.
//!
//! This crate defines what clients and the attendance server say to
//! each other:
//!
//! - **Types** ([`Request`], [`Response`], [`Envelope`], [`Identity`],
//!   [`ClassroomId`], attendance records): the structures that travel
//!   on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the
//! session engine. It knows nothing about union-find forests or
//! registries, only how requests and responses are shaped.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope<Request>) → Registry / Session
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AttendanceEntry, AttendanceRecord, AttendanceStatus, AttendanceSummary,
    ClassroomId, Envelope, ExceptionEntry, Identity, Request, Response, Role,
    RoundId,
};
