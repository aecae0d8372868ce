//! One classroom's attendance round.
//!
//! A [`Session`] owns the [`Forest`] for a round plus the list of
//! students who have no device. It is either `Active` or `Finalized`,
//! and finalizing is the only way out of `Active`.
//!
//! ```text
//!   Active ──(finalize)──→ Finalized
//! ```
//!
//! Presence is decided by one question at the end: is this student in
//! the teacher's component?

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use chrono::NaiveDate;
use rollcall_protocol::{
    AttendanceEntry, AttendanceRecord, AttendanceStatus, AttendanceSummary, ClassroomId, Identity,
    RoundId,
};

use crate::forest::{Forest, NodeId};
use crate::round::generate_round_id;
use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Accepting token passes, exceptions, and mark-present calls.
    Active,
    /// Terminal. Every operation is rejected.
    Finalized,
}

// ---------------------------------------------------------------------------
// Attendance
// ---------------------------------------------------------------------------

/// Presence of every student in a round, keyed by identity.
///
/// Never contains the teacher.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attendance {
    marks: BTreeMap<Identity, bool>,
}

impl Attendance {
    /// `Some(present)` for a student of the round, `None` otherwise.
    pub fn is_present(&self, identity: &str) -> Option<bool> {
        self.marks.get(identity).copied()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn present_count(&self) -> usize {
        self.marks.values().filter(|present| **present).count()
    }

    pub fn absent_count(&self) -> usize {
        self.len() - self.present_count()
    }

    /// Iterates `(identity, present)` sorted by identity.
    pub fn iter(&self) -> impl Iterator<Item = (&Identity, bool)> {
        self.marks.iter().map(|(identity, present)| (identity, *present))
    }

    pub fn summary(&self) -> AttendanceSummary {
        let present = self.present_count();
        AttendanceSummary {
            total: self.len(),
            present,
            absent: self.len() - present,
        }
    }

    /// Wire form, sorted by identity.
    pub fn entries(&self) -> Vec<AttendanceEntry> {
        self.iter()
            .map(|(identity, present)| AttendanceEntry {
                identity: identity.clone(),
                present,
            })
            .collect()
    }

    /// One dated record per student, ready for the attendance store.
    pub fn to_records(
        &self,
        classroom_id: ClassroomId,
        round_id: &RoundId,
        date: NaiveDate,
    ) -> Vec<AttendanceRecord> {
        self.iter()
            .map(|(identity, present)| AttendanceRecord {
                student: identity.clone(),
                classroom_id,
                round_id: round_id.clone(),
                date,
                status: AttendanceStatus::from_present(present),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One classroom's live attendance round.
///
/// The participant set is fixed at construction: one slot per roster
/// entry plus the teacher. Late joiners are unknown participants.
#[derive(Debug, Clone)]
pub struct Session {
    classroom_id: ClassroomId,
    round_id: RoundId,
    teacher: Identity,
    forest: Forest,
    /// Students with no device, resolved by the teacher at finalize.
    /// Every entry is a participant of `forest`.
    exceptions: HashSet<Identity>,
    phase: SessionPhase,
    started_at: Instant,
}

impl Session {
    /// Opens a round with a fresh random round id.
    pub fn new(
        classroom_id: ClassroomId,
        teacher: Identity,
        roster: impl IntoIterator<Item = Identity>,
    ) -> Self {
        Self::with_round_id(classroom_id, generate_round_id(), teacher, roster)
    }

    /// Opens a round with a caller-chosen round id.
    pub fn with_round_id(
        classroom_id: ClassroomId,
        round_id: RoundId,
        teacher: Identity,
        roster: impl IntoIterator<Item = Identity>,
    ) -> Self {
        let forest = Forest::new(teacher.clone(), roster);
        Self {
            classroom_id,
            round_id,
            teacher,
            forest,
            exceptions: HashSet::new(),
            phase: SessionPhase::Active,
            started_at: Instant::now(),
        }
    }

    pub fn classroom_id(&self) -> ClassroomId {
        self.classroom_id
    }

    pub fn round_id(&self) -> &RoundId {
        &self.round_id
    }

    pub fn teacher(&self) -> &Identity {
        &self.teacher
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Number of students in the round (the teacher doesn't count).
    pub fn student_count(&self) -> usize {
        self.forest.len() - 1
    }

    /// `true` if `identity` is the teacher or a student of this round.
    pub fn is_participant(&self, identity: &str) -> bool {
        self.forest.lookup(identity).is_some()
    }

    /// Read access to the underlying forest.
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Active => Ok(()),
            SessionPhase::Finalized => Err(SessionError::NotActive(self.classroom_id)),
        }
    }

    fn node(&self, identity: &Identity) -> Result<NodeId, SessionError> {
        self.forest
            .lookup(identity.as_str())
            .ok_or_else(|| SessionError::UnknownParticipant(identity.clone()))
    }

    /// Records that `from` handed the token to `to`.
    ///
    /// Both must be participants; otherwise nothing changes. Repeating a
    /// pass is harmless.
    pub fn pass_token(&mut self, from: &Identity, to: &Identity) -> Result<(), SessionError> {
        self.ensure_active()?;
        let from_node = self.node(from)?;
        let to_node = self.node(to)?;
        self.forest.union(from_node, to_node);
        tracing::debug!(
            classroom_id = %self.classroom_id,
            %from,
            %to,
            "token passed"
        );
        Ok(())
    }

    /// Puts a participant on the exception list.
    ///
    /// Returns `false` if they were already on it.
    pub fn add_exception(&mut self, identity: &Identity) -> Result<bool, SessionError> {
        self.ensure_active()?;
        self.node(identity)?;
        let added = self.exceptions.insert(identity.clone());
        if added {
            tracing::debug!(classroom_id = %self.classroom_id, %identity, "exception added");
        }
        Ok(added)
    }

    /// The exception list, sorted by identity.
    pub fn exceptions(&self) -> Result<Vec<Identity>, SessionError> {
        self.ensure_active()?;
        let mut list: Vec<Identity> = self.exceptions.iter().cloned().collect();
        list.sort();
        Ok(list)
    }

    pub fn is_exception(&self, identity: &str) -> bool {
        self.exceptions.contains(identity)
    }

    /// Links every listed participant straight to the teacher, whether
    /// or not they are on the exception list.
    ///
    /// The whole list is checked first. One unknown identity rejects the
    /// call and leaves the forest untouched. Returns how many identities
    /// were processed.
    pub fn mark_present(&mut self, identities: &[Identity]) -> Result<usize, SessionError> {
        self.ensure_active()?;
        let nodes = identities
            .iter()
            .map(|identity| self.node(identity))
            .collect::<Result<Vec<_>, _>>()?;

        let teacher = self.forest.teacher();
        for node in &nodes {
            self.forest.union(*node, teacher);
        }
        tracing::debug!(
            classroom_id = %self.classroom_id,
            count = nodes.len(),
            "participants marked present"
        );
        Ok(nodes.len())
    }

    /// `true` if `identity` is currently connected to the teacher.
    pub fn is_present(&mut self, identity: &Identity) -> Result<bool, SessionError> {
        let node = self.node(identity)?;
        let teacher = self.forest.teacher();
        Ok(self.forest.connected(node, teacher))
    }

    /// Presence of every student as things stand, without resolving
    /// exceptions and without ending the round.
    pub fn presence(&mut self) -> Attendance {
        let teacher = self.forest.teacher();
        let teacher_root = self.forest.find(teacher);
        let students: Vec<NodeId> = self.forest.students().collect();

        let mut marks = BTreeMap::new();
        for node in students {
            let present = self.forest.find(node) == teacher_root;
            marks.insert(self.forest.identity(node).clone(), present);
        }
        Attendance { marks }
    }

    /// Ends the round.
    ///
    /// Exception-listed students named in `present_from_exceptions` are
    /// linked to the teacher first. Names not on the exception list are
    /// ignored, so this step can't be used to mark arbitrary students.
    /// Then every student is present iff they share the teacher's root.
    pub fn finalize(
        &mut self,
        present_from_exceptions: &[Identity],
    ) -> Result<Attendance, SessionError> {
        self.ensure_active()?;

        let teacher = self.forest.teacher();
        for identity in present_from_exceptions {
            if !self.exceptions.contains(identity) {
                continue;
            }
            if let Some(node) = self.forest.lookup(identity.as_str()) {
                self.forest.union(node, teacher);
            }
        }

        let attendance = self.presence();
        self.phase = SessionPhase::Finalized;

        tracing::debug!(
            classroom_id = %self.classroom_id,
            round_id = %self.round_id,
            present = attendance.present_count(),
            absent = attendance.absent_count(),
            "presence computed"
        );
        Ok(attendance)
    }
}

// =========================================================================
// Tests
// =========================================================================
