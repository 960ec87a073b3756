// ── Command results & query log records ──

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::command::CommandId;
use crate::error::TransportFailure;

/// Outcome of one executor call, as recorded in the query log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    Success,
    ParseError,
    TransportError,
    /// The remote command ran but exited non-zero.
    CommandFailed,
}

/// Result of running one [`RemoteCommand`](crate::RemoteCommand).
///
/// Created by the executor and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    pub command: CommandId,
    pub output: String,
    pub stderr: String,
    /// Remote exit status; `None` on transport failure or signal.
    pub exit_status: Option<i32>,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
    /// Transport succeeded and the remote command exited 0.
    pub success: bool,
    pub transport_error: Option<TransportFailure>,
}

impl CommandResult {
    pub(crate) fn transport_failure(
        command: CommandId,
        failure: TransportFailure,
        duration: Duration,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            command,
            output: String::new(),
            stderr: String::new(),
            exit_status: None,
            duration,
            timestamp,
            success: false,
            transport_error: Some(failure),
        }
    }

    /// Outcome before any parsing is attempted.
    pub fn outcome(&self) -> Outcome {
        if self.transport_error.is_some() {
            Outcome::TransportError
        } else if self.success {
            Outcome::Success
        } else {
            Outcome::CommandFailed
        }
    }
}

/// One immutable line of the query log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    /// Position in the log since startup, starting at 1.
    pub seq: u64,
    pub command: CommandId,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: Outcome,
    /// Error text for anything but `Success`.
    pub detail: Option<String>,
    /// Length of the raw stdout, for diagnosing parse failures.
    pub raw_len: usize,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}
