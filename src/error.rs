//! Error taxonomy shared by the clients, the task runner and the config layer.

use std::time::Duration;

use thiserror::Error;

use crate::task::TaskSlot;

/// Every failure the dashboard core can report.
///
/// `Clone + PartialEq` so outcomes can cross the task channel and be compared
/// in tests.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MonitorError {
    /// Connection refused, DNS failure, TLS failure and the like.
    #[error("{0}")]
    Network(String),

    /// The fixed per-call timeout elapsed.
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Server answered with a non-2xx status.
    #[error("HTTP error: {status} for url ({url})")]
    Status { status: u16, url: String },

    /// Body was not JSON or did not have the expected shape.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Explicit rejection by the server; carries its message verbatim.
    #[error("{0}")]
    Auth(String),

    /// A call that needs a session was attempted without one.
    #[error("Not logged in: no session cookies available")]
    NotAuthenticated,

    /// A task is already in flight on this slot.
    #[error("A {0} task is already running")]
    SlotBusy(TaskSlot),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MonitorError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Network-level failures: the request may never have reached the server.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::Status { .. }
        )
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout(crate::transport::DEFAULT_TIMEOUT);
        }
        if let Some(status) = e.status() {
            return Self::Status {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        if e.is_decode() {
            return Self::Protocol(e.to_string());
        }
        Self::Network(e.to_string())
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}
