//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use routerscope_config::ConfigError;
use routerscope_core::CoreError;

pub mod exit_code {
    #[allow(dead_code)]
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const CONFIG: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to router at {host}")]
    #[diagnostic(
        code(routerscope::connection_failed),
        help(
            "Check that the router is reachable and sshd is running.\n\
             Reason: {reason}\n\
             Try: ssh {host}"
        )
    )]
    ConnectionFailed { host: String, reason: String },

    #[error("Lost the connection to the router")]
    #[diagnostic(code(routerscope::disconnected))]
    Disconnected,

    // ── Authentication ───────────────────────────────────────────────

    #[error("SSH authentication failed")]
    #[diagnostic(
        code(routerscope::auth_failed),
        help(
            "routerscope never prompts for passwords; key-based login is required.\n\
             Load your key into ssh-agent or pass --identity.\n\
             ssh said: {message}"
        )
    )]
    AuthFailed { message: String },

    // ── Device ───────────────────────────────────────────────────────

    #[error("Router rejected `{command}`: {message}")]
    #[diagnostic(code(routerscope::rejected))]
    Rejected { command: String, message: String },

    #[error("Polling failed before the first snapshot")]
    #[diagnostic(
        code(routerscope::no_snapshot),
        help("Run with -vv to see which command failed.\nLast failure: {reason}")
    )]
    NoSnapshot { reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid configuration: {message}")]
    #[diagnostic(
        code(routerscope::config),
        help(
            "Check the config file or flags.\n\
             Run: routerscope config show"
        )
    )]
    Config { message: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(routerscope::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(routerscope::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Prompt failed: {0}")]
    #[diagnostic(code(routerscope::prompt))]
    Prompt(String),

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Router did not respond within {seconds}s")]
    #[diagnostic(
        code(routerscope::timeout),
        help("Raise command_timeout_secs in the config or check the router's load.")
    )]
    Timeout { seconds: u64 },

    // ── Internal / IO ────────────────────────────────────────────────

    #[error("Internal error: {0}")]
    #[diagnostic(code(routerscope::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Disconnected | Self::NoSnapshot { .. } => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Config { .. } | Self::ConfigExists { .. } => exit_code::CONFIG,
            Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { host, reason } => Self::ConnectionFailed { host, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Disconnected => Self::Disconnected,
            CoreError::Rejected { command, message } => Self::Rejected {
                command: command.to_string(),
                message,
            },
            CoreError::Config { message } => Self::Config { message },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routerscope_core::CommandId;

    #[test]
    fn exit_codes_follow_failure_class() {
        let auth = CliError::from(CoreError::AuthenticationFailed {
            message: "Permission denied (publickey)".into(),
        });
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let timeout = CliError::from(CoreError::Timeout { timeout_secs: 10 });
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);

        let config = CliError::from(CoreError::Config {
            message: "WAN interface `wan` not found".into(),
        });
        assert_eq!(config.exit_code(), exit_code::CONFIG);

        let rejected = CliError::from(CoreError::Rejected {
            command: CommandId::FlushLeases,
            message: "no such file".into(),
        });
        assert_eq!(rejected.exit_code(), exit_code::GENERAL);
        assert_eq!(rejected.to_string(), "Router rejected `flush_leases`: no such file");
    }
}
