//! Session registry: at most one live round per classroom.
//!
//! # Locking
//!
//! The classroom map sits behind one mutex and every session behind its
//! own. Operations on one classroom are serialized by its session lock,
//! different classrooms run in parallel.
//!
//! Lock order is always session → map. `start` and `get` only take the
//! map lock; finalize holds the session lock across the store write and
//! then takes the map lock to drop the entry. Nothing takes the map lock
//! and then waits on a session, so the two can't deadlock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rollcall_protocol::{AttendanceRecord, AttendanceSummary, ClassroomId, Identity, RoundId};
use rollcall_session::{Attendance, Session};
use tokio::sync::Mutex;

use crate::{AttendanceStore, RegistryError};

/// The outcome of a successfully finalized and persisted round.
#[derive(Debug, Clone)]
pub struct FinalReport {
    pub classroom_id: ClassroomId,
    pub round_id: RoundId,
    pub date: NaiveDate,
    pub attendance: Attendance,
    /// Exactly what was handed to the store.
    pub records: Vec<AttendanceRecord>,
}

impl FinalReport {
    pub fn summary(&self) -> AttendanceSummary {
        self.attendance.summary()
    }
}

/// What [`SessionRegistry::start`] hands back about the round it opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedRound {
    pub round_id: RoundId,
    /// Students in the built round. Duplicate roster entries and the
    /// teacher's own entry are not counted.
    pub students: usize,
}

/// A cheap, cloneable reference to one classroom's live session.
///
/// A handle can outlive the registry entry. Once the round has been
/// finalized every operation reports [`RegistryError::NoActiveSession`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    classroom_id: ClassroomId,
    session: Arc<Mutex<Session>>,
}

impl SessionHandle {
    pub fn classroom_id(&self) -> ClassroomId {
        self.classroom_id
    }

    pub async fn round_id(&self) -> RoundId {
        self.session.lock().await.round_id().clone()
    }

    /// The teacher who started the round.
    pub async fn teacher(&self) -> Identity {
        self.session.lock().await.teacher().clone()
    }

    pub async fn student_count(&self) -> usize {
        self.session.lock().await.student_count()
    }

    pub async fn is_active(&self) -> bool {
        self.session.lock().await.is_active()
    }

    pub async fn pass_token(&self, from: &Identity, to: &Identity) -> Result<(), RegistryError> {
        Ok(self.session.lock().await.pass_token(from, to)?)
    }

    /// Returns `false` if the identity was already on the list.
    pub async fn add_exception(&self, identity: &Identity) -> Result<bool, RegistryError> {
        Ok(self.session.lock().await.add_exception(identity)?)
    }

    pub async fn exceptions(&self) -> Result<Vec<Identity>, RegistryError> {
        Ok(self.session.lock().await.exceptions()?)
    }

    /// Links `identities` to the teacher.
    ///
    /// `enrolled` is the classroom's current roster. Any identity not on
    /// it fails the call with [`RegistryError::IdentityNotEnrolled`]
    /// before the forest is touched.
    pub async fn mark_present(
        &self,
        identities: &[Identity],
        enrolled: &[Identity],
    ) -> Result<usize, RegistryError> {
        let mut session = self.session.lock().await;
        if !session.is_active() {
            return Err(RegistryError::NoActiveSession(self.classroom_id));
        }
        if let Some(stranger) = identities.iter().find(|id| !enrolled.contains(id)) {
            return Err(RegistryError::IdentityNotEnrolled(stranger.clone()));
        }
        Ok(session.mark_present(identities)?)
    }
}

/// Tracks every classroom with a live attendance round.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ClassroomId, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a round for `classroom_id` over a snapshot of its roster.
    ///
    /// The check and the insert happen under one lock, so of two
    /// concurrent starts for the same classroom exactly one wins.
    pub async fn start(
        &self,
        classroom_id: ClassroomId,
        teacher: Identity,
        roster: Vec<Identity>,
    ) -> Result<StartedRound, RegistryError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&classroom_id) {
            return Err(RegistryError::SessionAlreadyActive(classroom_id));
        }

        let session = Session::new(classroom_id, teacher, roster);
        let started = StartedRound {
            round_id: session.round_id().clone(),
            students: session.student_count(),
        };
        tracing::info!(
            %classroom_id,
            round_id = %started.round_id,
            teacher = %session.teacher(),
            students = started.students,
            "attendance round started"
        );
        sessions.insert(classroom_id, Arc::new(Mutex::new(session)));
        Ok(started)
    }

    /// The live round for `classroom_id`, if any.
    pub async fn get(&self, classroom_id: ClassroomId) -> Option<SessionHandle> {
        self.sessions
            .lock()
            .await
            .get(&classroom_id)
            .map(|session| SessionHandle {
                classroom_id,
                session: Arc::clone(session),
            })
    }

    async fn handle(&self, classroom_id: ClassroomId) -> Result<SessionHandle, RegistryError> {
        self.get(classroom_id)
            .await
            .ok_or(RegistryError::NoActiveSession(classroom_id))
    }

    pub async fn pass_token(
        &self,
        classroom_id: ClassroomId,
        from: &Identity,
        to: &Identity,
    ) -> Result<(), RegistryError> {
        self.handle(classroom_id).await?.pass_token(from, to).await
    }

    pub async fn add_exception(
        &self,
        classroom_id: ClassroomId,
        identity: &Identity,
    ) -> Result<bool, RegistryError> {
        self.handle(classroom_id).await?.add_exception(identity).await
    }

    pub async fn exceptions(
        &self,
        classroom_id: ClassroomId,
    ) -> Result<Vec<Identity>, RegistryError> {
        self.handle(classroom_id).await?.exceptions().await
    }

    pub async fn mark_present(
        &self,
        classroom_id: ClassroomId,
        identities: &[Identity],
        enrolled: &[Identity],
    ) -> Result<usize, RegistryError> {
        self.handle(classroom_id)
            .await?
            .mark_present(identities, enrolled)
            .await
    }

    /// Finalizes the round, persists it, and drops it from the registry.
    ///
    /// The round is finalized on a copy first. The live session is only
    /// replaced, and the entry only removed, after `store` accepts the
    /// records. If the store fails the round stays active and unchanged,
    /// so the call can simply be repeated.
    pub async fn finalize_and_remove<S: AttendanceStore>(
        &self,
        classroom_id: ClassroomId,
        present_from_exceptions: &[Identity],
        store: &S,
        date: NaiveDate,
    ) -> Result<FinalReport, RegistryError> {
        let handle = self.handle(classroom_id).await?;
        let mut session = handle.session.lock().await;

        let mut draft = session.clone();
        let attendance = draft.finalize(present_from_exceptions)?;
        let round_id = draft.round_id().clone();
        let records = attendance.to_records(classroom_id, &round_id, date);

        if let Err(err) = store.record(&records).await {
            tracing::warn!(
                %classroom_id,
                round_id = %round_id,
                error = %err,
                "attendance store rejected round, leaving it active"
            );
            return Err(err.into());
        }

        *session = draft;
        {
            let mut sessions = self.sessions.lock().await;
            // A newer round may already sit under this id; leave it alone.
            if sessions
                .get(&classroom_id)
                .is_some_and(|live| Arc::ptr_eq(live, &handle.session))
            {
                sessions.remove(&classroom_id);
            }
        }

        tracing::info!(
            %classroom_id,
            round_id = %round_id,
            present = attendance.present_count(),
            absent = attendance.absent_count(),
            elapsed_secs = session.started_at().elapsed().as_secs(),
            "attendance round finalized"
        );

        Ok(FinalReport {
            classroom_id,
            round_id,
            date,
            attendance,
            records,
        })
    }

    pub async fn is_active(&self, classroom_id: ClassroomId) -> bool {
        self.sessions.lock().await.contains_key(&classroom_id)
    }

    /// Classrooms with a live round, sorted by id.
    pub async fn list_active(&self) -> Vec<ClassroomId> {
        let mut ids: Vec<ClassroomId> = self.sessions.lock().await.keys().copied().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
