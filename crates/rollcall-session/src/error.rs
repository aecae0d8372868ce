//! Error types for the session layer.

use rollcall_protocol::{ClassroomId, Identity};

/// Errors raised by a single attendance round or by authentication.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The caller's token was empty, unknown, or rejected by the
    /// [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The identity isn't the teacher or a student of this round.
    /// Nothing was changed.
    #[error("{0} is not a participant of this round")]
    UnknownParticipant(Identity),

    /// The round has already been finalized.
    #[error("no active round for classroom {0}")]
    NotActive(ClassroomId),
}
