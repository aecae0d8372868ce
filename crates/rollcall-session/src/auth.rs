//! Caller authentication.
//!
//! The server never decides who a caller is by itself. It hands the
//! handshake token to an [`Authenticator`] and gets back a [`Caller`]:
//! an identity plus the role that gates which requests they may send.
//!
//! [`TokenAuthenticator`] is a static token table, loaded from the
//! fixture file in development and used directly in tests. A real
//! deployment plugs in its own implementation.

use std::collections::HashMap;

use rollcall_protocol::{Identity, Role};

use crate::SessionError;

/// An authenticated participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub identity: Identity,
    pub role: Role,
}

impl Caller {
    pub fn new(identity: impl Into<Identity>, role: Role) -> Self {
        Self {
            identity: identity.into(),
            role,
        }
    }

    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }
}

/// Resolves a bearer token to a [`Caller`].
///
/// `Send + Sync + 'static` so one instance can be shared by every
/// connection task for the lifetime of the server.
pub trait Authenticator: Send + Sync + 'static {
    /// Returns the caller behind `token`, or
    /// [`SessionError::AuthFailed`] if the token is missing or invalid.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Caller, SessionError>> + Send;
}

/// An [`Authenticator`] backed by a fixed token table.
#[derive(Debug, Clone, Default)]
pub struct TokenAuthenticator {
    tokens: HashMap<String, Caller>,
}

impl TokenAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` for `caller`, replacing any earlier entry.
    pub fn insert(&mut self, token: impl Into<String>, caller: Caller) {
        self.tokens.insert(token.into(), caller);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_token(mut self, token: impl Into<String>, caller: Caller) -> Self {
        self.insert(token, caller);
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Caller, SessionError> {
        if token.is_empty() {
            return Err(SessionError::AuthFailed("missing token".into()));
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| SessionError::AuthFailed("unknown token".into()))
    }
}
