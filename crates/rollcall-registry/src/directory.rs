//! Who teaches and who is enrolled.
//!
//! The registry never owns rosters. It asks a [`ClassroomDirectory`]
//! when a round starts and again whenever a teacher marks students
//! present, so roster changes made mid-round are honored for overrides.

use std::collections::HashMap;

use rollcall_protocol::{ClassroomId, Identity};

use crate::RegistryError;

/// A classroom as the directory knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classroom {
    pub id: ClassroomId,
    pub name: String,
    pub teacher: Identity,
    pub students: Vec<Identity>,
}

impl Classroom {
    pub fn is_enrolled(&self, identity: &Identity) -> bool {
        self.students.contains(identity)
    }
}

/// Looks up classrooms and people.
pub trait ClassroomDirectory: Send + Sync + 'static {
    /// The classroom with `id`, or [`RegistryError::ClassroomNotFound`].
    fn classroom(
        &self,
        id: ClassroomId,
    ) -> impl std::future::Future<Output = Result<Classroom, RegistryError>> + Send;

    /// Human-readable name for `identity`, if known.
    fn display_name(
        &self,
        identity: &Identity,
    ) -> impl std::future::Future<Output = Option<String>> + Send;
}

/// An in-memory [`ClassroomDirectory`].
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    classrooms: HashMap<ClassroomId, Classroom>,
    names: HashMap<Identity, String>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a classroom.
    pub fn insert_classroom(&mut self, classroom: Classroom) {
        self.classrooms.insert(classroom.id, classroom);
    }

    /// Sets the display name for `identity`.
    pub fn insert_name(&mut self, identity: impl Into<Identity>, name: impl Into<String>) {
        self.names.insert(identity.into(), name.into());
    }

    pub fn with_classroom(mut self, classroom: Classroom) -> Self {
        self.insert_classroom(classroom);
        self
    }

    pub fn with_name(mut self, identity: impl Into<Identity>, name: impl Into<String>) -> Self {
        self.insert_name(identity, name);
        self
    }

    /// Mutable access to a classroom, e.g. to change its roster.
    pub fn classroom_mut(&mut self, id: ClassroomId) -> Option<&mut Classroom> {
        self.classrooms.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.classrooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classrooms.is_empty()
    }
}

impl ClassroomDirectory for MemoryDirectory {
    async fn classroom(&self, id: ClassroomId) -> Result<Classroom, RegistryError> {
        self.classrooms
            .get(&id)
            .cloned()
            .ok_or(RegistryError::ClassroomNotFound(id))
    }

    async fn display_name(&self, identity: &Identity) -> Option<String> {
        self.names.get(identity).cloned()
    }
}
