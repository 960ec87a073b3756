use thiserror::Error;

/// Top-level error type for the `routerscope-api` crate.
///
/// Covers every way the SSH channel can fail. A remote command that ran and
/// exited non-zero is *not* an error at this layer; it comes back as an
/// [`ExecOutput`](crate::ExecOutput) with its exit status.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The router rejected our key (BatchMode never prompts).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Channel ─────────────────────────────────────────────────────
    /// The `ssh` client could not be spawned at all.
    #[error("Failed to spawn ssh: {0}")]
    Spawn(#[from] std::io::Error),

    /// The master connection could not be established.
    #[error("Cannot connect to {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    /// The multiplexed channel dropped while running a command
    /// (`ssh` exits 255 for every client-side failure).
    #[error("SSH channel failed: {stderr}")]
    Channel { stderr: String },

    /// `exec` was called before `connect` or after `close`.
    #[error("SSH session is not connected")]
    NotConnected,

    // ── Timing ──────────────────────────────────────────────────────
    #[error("Command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl Error {
    /// Returns `true` if re-establishing the master connection may fix it.
    pub fn is_channel_failure(&self) -> bool {
        matches!(
            self,
            Self::Channel { .. } | Self::NotConnected | Self::ConnectionFailed { .. }
        )
    }

    /// Returns `true` if the failure is down to credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Classify a failed `ssh` client invocation from its stderr.
    pub(crate) fn from_client_stderr(host: &str, stderr: &str) -> Self {
        let trimmed = stderr.trim();
        if trimmed.contains("Permission denied") || trimmed.contains("Host key verification failed")
        {
            Self::Authentication {
                message: trimmed.to_owned(),
            }
        } else if trimmed.contains("Connection refused")
            || trimmed.contains("No route to host")
            || trimmed.contains("Could not resolve hostname")
            || trimmed.contains("Connection timed out")
        {
            Self::ConnectionFailed {
                host: host.to_owned(),
                reason: trimmed.to_owned(),
            }
        } else {
            Self::Channel {
                stderr: trimmed.to_owned(),
            }
        }
    }
}
