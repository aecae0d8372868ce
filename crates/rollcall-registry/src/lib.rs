//! Live attendance rounds for Rollcall.
//!
//! The registry maps each classroom to at most one running
//! [`Session`](rollcall_session::Session) and is the only thing the API
//! layer talks to for round state.
//!
//! # Key types
//!
//! - [`SessionRegistry`]: starts, looks up, and finalizes rounds
//! - [`SessionHandle`]: operations on one classroom's live round
//! - [`ClassroomDirectory`]: teachers and rosters ([`MemoryDirectory`])
//! - [`AttendanceStore`]: where finalized records go ([`MemoryStore`])
//! - [`FinalReport`]: what a successful finalize hands back

#![allow(async_fn_in_trait)]

mod directory;
mod error;
mod registry;
mod store;

pub use directory::{Classroom, ClassroomDirectory, MemoryDirectory};
pub use error::RegistryError;
pub use registry::{FinalReport, SessionHandle, SessionRegistry, StartedRound};
pub use store::{AttendanceStore, MemoryStore, StoreError};
