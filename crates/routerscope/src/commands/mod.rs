//! Command handlers, one module per subcommand.

pub mod config_cmd;
pub mod control;
pub mod snapshot;
pub mod watch;

mod util;

use std::sync::Arc;

use routerscope_api::SshSession;
use routerscope_config::{self as config, Config};
use routerscope_core::{MetricsSnapshot, Monitor, MonitorConfig, SchedulerState};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve file, env and flags into one config.
pub fn resolve_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = config::load_config(global.config.as_deref())?;
    cfg.apply(global.overrides());
    Ok(cfg)
}

/// Validate, open the SSH session and start polling.
pub async fn start_monitor(cfg: &Config) -> Result<Monitor, CliError> {
    let monitor_config: MonitorConfig = cfg.to_monitor_config()?;
    let control_dir = config::control_dir();
    std::fs::create_dir_all(&control_dir)?;
    let ssh = cfg.to_ssh_config(&control_dir)?;

    tracing::debug!(destination = %ssh.destination(), "opening ssh session");
    let monitor = Monitor::start(monitor_config, SshSession::new(ssh)).await?;
    Ok(monitor)
}

/// Wait for the first published snapshot. A failed cycle before that
/// means the device stopped answering right after startup.
pub async fn first_snapshot(monitor: &Monitor) -> Result<Arc<MetricsSnapshot>, CliError> {
    let mut stream = monitor.subscribe();
    let mut state = monitor.state();

    tokio::select! {
        snapshot = stream.changed() => snapshot.ok_or(CliError::Disconnected),
        backoff = state.wait_for(|s| matches!(s, SchedulerState::Backoff { .. })) => {
            let reason = match backoff {
                Ok(s) => s.to_string(),
                Err(_) => "scheduler stopped".into(),
            };
            let last_failure = monitor
                .query_log()
                .iter()
                .rev()
                .find_map(|e| e.detail.clone())
                .unwrap_or(reason);
            Err(CliError::NoSnapshot { reason: last_failure })
        }
    }
}
