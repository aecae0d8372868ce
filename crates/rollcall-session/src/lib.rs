//! Attendance rounds for Rollcall.
//!
//! This crate is the engine: it decides who was in the room.
//!
//! 1. **Forest** ([`Forest`]): a union-find arena with one slot per
//!    participant. Passing the token merges two components, and the
//!    teacher's slot absorbs whatever it touches.
//! 2. **Session** ([`Session`]): one round for one classroom. Token
//!    passes, the no-device exception list, teacher overrides, and the
//!    final presence computation.
//! 3. **Authentication** ([`Authenticator`]): turning a bearer token
//!    into a [`Caller`] with a role.
//!
//! # How it fits in the stack
//!
//! ```text
//! Registry (above)  ← one Session per classroom, behind locks
//!     ↕
//! Session (this crate)  ← union-find, exceptions, finalize
//!     ↕
//! Protocol (below)  ← Identity, ClassroomId, AttendanceRecord
//! ```
//!
//! Nothing in here is async apart from the [`Authenticator`] trait.
//! Locking is the registry's job.

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod forest;
mod round;
mod session;

pub use auth::{Authenticator, Caller, TokenAuthenticator};
pub use error::SessionError;
pub use forest::{Forest, NodeId, NodeKind};
pub use round::generate_round_id;
pub use session::{Attendance, Session, SessionPhase};
