//! `RollcallServer` builder and accept loop.
//!
//! This ties the layers together: transport → protocol → registry →
//! session. Every accepted socket gets its own task running
//! `handle_connection`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rollcall_protocol::{Codec, JsonCodec};
use rollcall_registry::{AttendanceStore, ClassroomDirectory, SessionRegistry};
use rollcall_session::Authenticator;
use rollcall_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{RollcallError, ServerConfig};

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<A, D, S, C> {
    pub(crate) registry: SessionRegistry,
    pub(crate) auth: A,
    pub(crate) directory: D,
    pub(crate) store: S,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Rollcall server.
///
/// # Example
///
/// ```rust,ignore
/// use rollcall::prelude::*;
///
/// let fixture = Fixture::load("fixtures/demo.json".as_ref()).await?;
/// let server = RollcallServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(fixture.authenticator(), fixture.directory(), MemoryStore::new())
///     .await?;
/// server.run().await
/// ```
pub struct RollcallServerBuilder {
    config: ServerConfig,
}

impl RollcallServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets how long a new connection may take to hand-shake.
    /// Rounded down to whole seconds.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout_secs = timeout.as_secs();
        self
    }

    /// Sets how long an authenticated connection may stay silent.
    /// Rounded down to whole seconds.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout_secs = timeout.as_secs();
        self
    }

    /// Validates the configuration, binds the listener, and returns a
    /// server ready to [`run`](RollcallServer::run).
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<A, D, S>(
        self,
        auth: A,
        directory: D,
        store: S,
    ) -> Result<RollcallServer<A, D, S, JsonCodec>, RollcallError>
    where
        A: Authenticator,
        D: ClassroomDirectory,
        S: AttendanceStore,
    {
        self.config.validate()?;
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: SessionRegistry::new(),
            auth,
            directory,
            store,
            codec: JsonCodec,
            config: self.config,
        });

        Ok(RollcallServer { transport, state })
    }
}

impl Default for RollcallServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Rollcall server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RollcallServer<A, D, S, C> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, D, S, C>>,
}

impl<A, D, S, C> RollcallServer<A, D, S, C>
where
    A: Authenticator,
    D: ClassroomDirectory,
    S: AttendanceStore,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, RollcallError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(mut self) -> Result<(), RollcallError> {
        tracing::info!(addr = %self.local_addr()?, "Rollcall server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
