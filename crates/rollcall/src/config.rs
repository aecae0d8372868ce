//! Server configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::RollcallError;

/// Settings for a [`RollcallServer`](crate::RollcallServer).
///
/// Deserializable so it can be embedded in a larger config file. Missing
/// fields fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// How long a new connection has to send its `Handshake`.
    pub handshake_timeout_secs: u64,

    /// How long an authenticated connection may stay silent before the
    /// server drops it. Clients keep it alive with `Heartbeat`.
    pub idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            handshake_timeout_secs: 5,
            idle_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Rejects settings that would make every connection time out at once.
    pub fn validate(&self) -> Result<(), RollcallError> {
        if self.bind_addr.is_empty() {
            return Err(RollcallError::Config("bind address is empty".into()));
        }
        if self.handshake_timeout_secs == 0 {
            return Err(RollcallError::Config(
                "handshake timeout must be at least one second".into(),
            ));
        }
        if self.idle_timeout_secs == 0 {
            return Err(RollcallError::Config(
                "idle timeout must be at least one second".into(),
            ));
        }
        Ok(())
    }
}
