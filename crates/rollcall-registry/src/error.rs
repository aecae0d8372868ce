//! Error types for the registry layer.

use rollcall_protocol::{ClassroomId, Identity};
use rollcall_session::SessionError;

use crate::StoreError;

/// Errors that can occur during registry operations.
///
/// Everything except [`Store`](Self::Store) is the caller's fault and
/// won't succeed on retry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// `start` was called for a classroom that already has a live round.
    #[error("classroom {0} already has an active round")]
    SessionAlreadyActive(ClassroomId),

    /// There is no live round for the classroom, either because none was
    /// started or because it has been finalized.
    #[error("no active round for classroom {0}")]
    NoActiveSession(ClassroomId),

    /// The identity isn't a participant of the round.
    #[error("{0} is not a participant of this round")]
    UnknownParticipant(Identity),

    /// The identity isn't on the classroom's current roster.
    #[error("{0} is not enrolled in this classroom")]
    IdentityNotEnrolled(Identity),

    /// The directory doesn't know the classroom.
    #[error("classroom {0} not found")]
    ClassroomNotFound(ClassroomId),

    /// The attendance store rejected a write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Any other session-layer failure.
    #[error(transparent)]
    Session(SessionError),
}

impl RegistryError {
    /// Stable snake_case tag, used on the wire and in logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::SessionAlreadyActive(_) => "session_already_active",
            Self::NoActiveSession(_) => "no_active_session",
            Self::UnknownParticipant(_) => "unknown_participant",
            Self::IdentityNotEnrolled(_) => "identity_not_enrolled",
            Self::ClassroomNotFound(_) => "classroom_not_found",
            Self::Store(_) => "store_failure",
            Self::Session(_) => "session_error",
        }
    }
}

impl From<SessionError> for RegistryError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotActive(classroom_id) => Self::NoActiveSession(classroom_id),
            SessionError::UnknownParticipant(identity) => Self::UnknownParticipant(identity),
            other => Self::Session(other),
        }
    }
}
