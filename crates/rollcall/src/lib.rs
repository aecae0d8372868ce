//! # Rollcall
//!
//! Classroom attendance by token passing.
//!
//! A teacher opens a round for a classroom. Students hand a token to one
//! another on their phones, and each hand-off is reported to the server.
//! When the teacher finalizes, every student whose chain of hand-offs
//! reaches the teacher is present; everyone else is absent. Students
//! without a device go on an exception list the teacher resolves by hand.
//!
//! This crate is the server: a WebSocket listener speaking JSON
//! envelopes, wired to the [`SessionRegistry`] through a per-connection
//! handler that authenticates callers and checks their role.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rollcall::prelude::*;
//!
//! # async fn run() -> Result<(), RollcallError> {
//! let fixture = Fixture::load("fixtures/demo.json".as_ref()).await?;
//! let server = RollcallServerBuilder::new()
//!     .bind("127.0.0.1:8080")
//!     .build(fixture.authenticator(), fixture.directory(), MemoryStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod fixture;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::RollcallError;
pub use fixture::{Fixture, FixtureClassroom, FixtureError, FixtureUser};
pub use server::{PROTOCOL_VERSION, RollcallServer, RollcallServerBuilder};

pub use rollcall_registry::SessionRegistry;

/// Everything needed to run a server or talk to one.
pub mod prelude {
    pub use crate::{
        Fixture, PROTOCOL_VERSION, RollcallError, RollcallServer, RollcallServerBuilder,
        ServerConfig,
    };
    pub use rollcall_protocol::{
        AttendanceEntry, AttendanceRecord, AttendanceStatus, AttendanceSummary, ClassroomId,
        Codec, Envelope, ExceptionEntry, Identity, JsonCodec, Request, Response, Role, RoundId,
    };
    pub use rollcall_registry::{
        AttendanceStore, Classroom, ClassroomDirectory, MemoryDirectory, MemoryStore,
        RegistryError, StoreError,
    };
    pub use rollcall_session::{Authenticator, Caller, SessionError, TokenAuthenticator};
}
