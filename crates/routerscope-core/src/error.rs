// ── Core error types ──
//
// User-facing errors from routerscope-core. Raw ssh failures never leak
// out directly: `From<routerscope_api::Error>` translates them into
// domain variants. Per-cycle failures (`CollectError`) never escape the
// scheduler; they become snapshot staleness or omitted metrics.

use serde::Serialize;
use thiserror::Error;

use crate::command::CommandId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Device did not respond within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Monitor is not running")]
    Disconnected,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Command `{command}` rejected by device: {message}")]
    Rejected { command: CommandId, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    /// Invalid startup configuration, including a device that cannot be
    /// reached or lacks the configured interface. Never retried.
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Like `From<TransportFailure>`, naming `peer` in connection errors.
    pub(crate) fn from_transport(failure: TransportFailure, peer: &str) -> Self {
        match Self::from(failure) {
            Self::ConnectionFailed { reason, .. } => Self::ConnectionFailed {
                host: peer.to_owned(),
                reason,
            },
            other => other,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<routerscope_api::Error> for CoreError {
    fn from(err: routerscope_api::Error) -> Self {
        match err {
            routerscope_api::Error::Authentication { message } => {
                Self::AuthenticationFailed { message }
            }
            routerscope_api::Error::ConnectionFailed { host, reason } => {
                Self::ConnectionFailed { host, reason }
            }
            routerscope_api::Error::Timeout { timeout_ms } => Self::Timeout {
                timeout_secs: timeout_ms.div_ceil(1000),
            },
            routerscope_api::Error::NotConnected => Self::Disconnected,
            routerscope_api::Error::Channel { stderr } => Self::ConnectionFailed {
                host: String::new(),
                reason: stderr,
            },
            routerscope_api::Error::Spawn(e) => Self::Internal(format!("cannot run ssh: {e}")),
        }
    }
}

impl From<TransportFailure> for CoreError {
    fn from(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::Timeout { timeout_ms } => Self::Timeout {
                timeout_secs: timeout_ms.div_ceil(1000),
            },
            TransportFailure::Authentication(message) => Self::AuthenticationFailed { message },
            TransportFailure::Channel(reason) | TransportFailure::Spawn(reason) => {
                Self::ConnectionFailed {
                    host: String::new(),
                    reason,
                }
            }
            TransportFailure::Stopped => Self::Disconnected,
        }
    }
}

// ── Transport failures ───────────────────────────────────────────────

/// Why a command never produced output. Cloneable so it can live inside
/// [`CommandResult`](crate::CommandResult) and the query log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TransportFailure {
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("channel failure: {0}")]
    Channel(String),

    #[error("cannot run ssh: {0}")]
    Spawn(String),

    /// The executor task is gone (shutdown in progress).
    #[error("executor stopped")]
    Stopped,
}

impl From<routerscope_api::Error> for TransportFailure {
    fn from(err: routerscope_api::Error) -> Self {
        match err {
            routerscope_api::Error::Timeout { timeout_ms } => Self::Timeout { timeout_ms },
            routerscope_api::Error::Authentication { message } => Self::Authentication(message),
            routerscope_api::Error::Spawn(e) => Self::Spawn(e.to_string()),
            other @ (routerscope_api::Error::Channel { .. }
            | routerscope_api::Error::ConnectionFailed { .. }
            | routerscope_api::Error::NotConnected) => Self::Channel(other.to_string()),
        }
    }
}

// ── Parse errors ─────────────────────────────────────────────────────

/// Output of one command contained nothing recognizable.
///
/// Carries only the length of the offending text, not the text itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse `{command}` output ({raw_len} bytes): {reason}")]
pub struct ParseError {
    pub command: CommandId,
    pub reason: String,
    pub raw_len: usize,
}

impl ParseError {
    pub fn new(command: CommandId, reason: impl Into<String>, raw: &str) -> Self {
        Self {
            command,
            reason: reason.into(),
            raw_len: raw.len(),
        }
    }
}

// ── Per-command collection failures ──────────────────────────────────

/// Failure of a single [`Executor::execute_parsed`](crate::Executor::execute_parsed) call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectError {
    #[error("transport error: {0}")]
    Transport(TransportFailure),

    #[error("remote command exited with status {}: {stderr}", .status.map_or_else(|| "signal".to_owned(), |s| s.to_string()))]
    CommandFailed { status: Option<i32>, stderr: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl CollectError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
