//! Connection lifecycle shared by every driver.
//!
//! ```text
//! Disconnected -> Connecting -> Connected <-> Recording
//!       ^             |             |            |
//!       |             v             v            v
//!       +-------- Disconnecting <---+------------+
//! ```
//!
//! `Connecting -> Disconnected` is the failed-connect edge. `disconnect` may be
//! issued from any state other than `Disconnected`, where it is a no-op.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a driver is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport resources are held.
    #[default]
    Disconnected,
    /// `connect` is in flight.
    Connecting,
    /// Link established, camera idle.
    Connected,
    /// Link established, camera recording.
    Recording,
    /// `disconnect` is releasing resources.
    Disconnecting,
}

impl ConnectionState {
    /// True when commands can be sent to the camera.
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Recording)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (Disconnected, Connecting) => true,
            (Connecting, Connected) | (Connecting, Disconnected) => true,
            (Connected, Recording) | (Recording, Connected) => true,
            (Connecting | Connected | Recording, Disconnecting) => true,
            (Disconnecting, Disconnected) => true,
            _ => false,
        }
    }

    /// Lowercase name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Recording => "recording",
            ConnectionState::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of the connection-status notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Whether the link is up after this transition.
    pub connected: bool,
    /// Human-readable status or error detail.
    pub message: String,
}

impl ConnectionStatus {
    /// Status for a link that came up.
    pub fn up(message: impl Into<String>) -> Self {
        Self {
            connected: true,
            message: message.into(),
        }
    }

    /// Status for a link that went down or never came up.
    pub fn down(message: impl Into<String>) -> Self {
        Self {
            connected: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = if self.connected { "up" } else { "down" };
        write!(f, "[{}] {}", flag, self.message)
    }
}
