//! JSON fixture that seeds the in-memory directory and authenticator.
//!
//! ```json
//! {
//!   "users": [
//!     { "identity": "prof-lee", "token": "tok-lee", "name": "Dr. Lee", "role": "teacher" }
//!   ],
//!   "classrooms": [
//!     { "id": 101, "name": "Distributed Systems", "teacher": "prof-lee", "students": [] }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rollcall_protocol::{ClassroomId, Identity, Role};
use rollcall_registry::{Classroom, MemoryDirectory};
use rollcall_session::{Caller, TokenAuthenticator};
use serde::Deserialize;

/// Errors raised while loading a fixture.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixture {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed fixture: {0}")]
    Parse(#[from] serde_json::Error),

    /// Well-formed JSON that describes an inconsistent world.
    #[error("invalid fixture: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FixtureUser {
    pub identity: Identity,
    pub token: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FixtureClassroom {
    pub id: ClassroomId,
    pub name: String,
    pub teacher: Identity,
    #[serde(default)]
    pub students: Vec<Identity>,
}

/// Users and classrooms for a development or test server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<FixtureUser>,
    #[serde(default)]
    pub classrooms: Vec<FixtureClassroom>,
}

impl Fixture {
    /// Parses and validates a fixture.
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        let fixture: Self = serde_json::from_str(json)?;
        fixture.validate()?;
        Ok(fixture)
    }

    /// Reads, parses, and validates the fixture at `path`.
    pub async fn load(path: &Path) -> Result<Self, FixtureError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FixtureError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), FixtureError> {
        let mut tokens = HashSet::new();
        let mut identities = HashSet::new();
        for user in &self.users {
            if user.token.is_empty() {
                return Err(FixtureError::Invalid(format!(
                    "user {} has an empty token",
                    user.identity
                )));
            }
            if !tokens.insert(user.token.as_str()) {
                return Err(FixtureError::Invalid(format!(
                    "token of user {} is not unique",
                    user.identity
                )));
            }
            if !identities.insert(&user.identity) {
                return Err(FixtureError::Invalid(format!(
                    "user {} is listed twice",
                    user.identity
                )));
            }
        }

        let mut classroom_ids = HashSet::new();
        for classroom in &self.classrooms {
            if !classroom_ids.insert(classroom.id) {
                return Err(FixtureError::Invalid(format!(
                    "classroom {} is listed twice",
                    classroom.id
                )));
            }
            let teacher = self.users.iter().find(|u| u.identity == classroom.teacher);
            if teacher.is_some_and(|u| u.role != Role::Teacher) {
                return Err(FixtureError::Invalid(format!(
                    "classroom {} is taught by {}, who is not a teacher",
                    classroom.id, classroom.teacher
                )));
            }
        }
        Ok(())
    }

    /// A directory holding every classroom, with user names attached.
    pub fn directory(&self) -> MemoryDirectory {
        let mut directory = MemoryDirectory::new();
        for classroom in &self.classrooms {
            directory.insert_classroom(Classroom {
                id: classroom.id,
                name: classroom.name.clone(),
                teacher: classroom.teacher.clone(),
                students: classroom.students.clone(),
            });
        }
        for user in &self.users {
            if let Some(name) = &user.name {
                directory.insert_name(user.identity.clone(), name.clone());
            }
        }
        directory
    }

    /// An authenticator accepting each user's token.
    pub fn authenticator(&self) -> TokenAuthenticator {
        let mut auth = TokenAuthenticator::new();
        for user in &self.users {
            auth.insert(user.token.clone(), Caller::new(user.identity.clone(), user.role));
        }
        auth
    }
}
