// ── Monitor facade ──
//
// Full lifecycle of one monitored router: validate config, connect,
// probe the WAN interface, spawn the executor and scheduler tasks, serve
// reads and control actions, shut down in order.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use routerscope_api::Transport;

use crate::command::{CommandId, CommandSet};
use crate::config::MonitorConfig;
use crate::error::{CollectError, CoreError, TransportFailure};
use crate::executor::Executor;
use crate::model::{CommandResult, InterfaceCounterSample, MetricsSnapshot, QueryLogEntry};
use crate::parser::parse_interface_counters;
use crate::scheduler::{Scheduler, SchedulerState};
use crate::store::{QueryLog, SnapshotStore};
use crate::stream::SnapshotStream;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. Reads never wait on the
/// poll loop; control actions queue behind whatever command is on the
/// wire.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    peer: String,
    commands: CommandSet,
    executor: Executor,
    store: Arc<SnapshotStore>,
    state: watch::Receiver<SchedulerState>,
    scheduler_cancel: CancellationToken,
    executor_cancel: CancellationToken,
    scheduler_task: Mutex<Option<JoinHandle<()>>>,
    executor_task: Mutex<Option<JoinHandle<()>>>,
}

impl Monitor {
    /// Validate `config`, connect `transport` and start polling.
    ///
    /// Everything that goes wrong here is fatal and never retried: an
    /// invalid config, an unreachable or unauthenticated device, or a WAN
    /// interface the device does not have.
    pub async fn start<T: Transport>(config: MonitorConfig, mut transport: T) -> Result<Self, CoreError> {
        config.validate()?;
        let commands = CommandSet::from_config(&config);
        let peer = transport.peer().to_owned();

        info!(peer = %peer, "connecting to router");
        match tokio::time::timeout(config.command_timeout, transport.connect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(CoreError::Timeout {
                    timeout_secs: config.command_timeout.as_secs(),
                });
            }
        }

        let query_log = Arc::new(QueryLog::new(config.log_capacity));
        let executor_cancel = CancellationToken::new();
        let (executor, executor_task) =
            Executor::spawn(transport, query_log, executor_cancel.clone());

        let baseline = match probe_wan(&executor, &commands, &config, &peer).await {
            Ok(sample) => sample,
            Err(e) => {
                executor_cancel.cancel();
                let _ = executor_task.await;
                return Err(e);
            }
        };

        let store = Arc::new(SnapshotStore::new(config.history_size));
        let (state_tx, state) = watch::channel(SchedulerState::Idle);
        let mut scheduler = Scheduler::new(
            &config,
            executor.clone(),
            commands.clone(),
            Arc::clone(&store),
            state_tx,
        );
        scheduler.seed_baseline(baseline);

        let scheduler_cancel = CancellationToken::new();
        let scheduler_task = tokio::spawn(scheduler.run(scheduler_cancel.clone()));

        info!(peer = %peer, wan = %config.wan_interface, "monitor started");
        Ok(Self {
            inner: Arc::new(MonitorInner {
                config,
                peer,
                commands,
                executor,
                store,
                state,
                scheduler_cancel,
                executor_cancel,
                scheduler_task: Mutex::new(Some(scheduler_task)),
                executor_task: Mutex::new(Some(executor_task)),
            }),
        })
    }

    /// Stop polling, then release the channel. The scheduler finishes the
    /// cycle it is in; queued control actions after that fail with
    /// [`CoreError::Disconnected`]. Calling this twice is harmless.
    pub async fn shutdown(&self) {
        self.inner.scheduler_cancel.cancel();
        if let Some(handle) = self.inner.scheduler_task.lock().await.take() {
            let _ = handle.await;
        }

        self.inner.executor_cancel.cancel();
        if let Some(handle) = self.inner.executor_task.lock().await.take() {
            let _ = handle.await;
        }
        debug!("monitor shut down");
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The current snapshot; `None` until the first cycle succeeds.
    pub fn snapshot(&self) -> Option<Arc<MetricsSnapshot>> {
        self.inner.store.current()
    }

    /// Prior snapshots, oldest first.
    pub fn history(&self) -> Vec<Arc<MetricsSnapshot>> {
        self.inner.store.history()
    }

    pub fn query_log(&self) -> Vec<Arc<QueryLogEntry>> {
        self.inner.executor.query_log().entries()
    }

    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.inner.state.clone()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        self.inner.store.subscribe()
    }

    // ── Control actions ──────────────────────────────────────────────

    /// Delete every DHCP lease and restart the DHCP server.
    pub async fn flush_leases(&self) -> Result<CommandResult, CoreError> {
        self.control(CommandId::FlushLeases).await
    }

    /// Soft-reboot the device. A channel that drops while the command is
    /// in flight counts as success; the command is never re-sent.
    pub async fn reboot(&self) -> Result<CommandResult, CoreError> {
        self.control(CommandId::Reboot).await
    }

    async fn control(&self, id: CommandId) -> Result<CommandResult, CoreError> {
        let command = self
            .inner
            .commands
            .get(id)
            .ok_or_else(|| CoreError::Internal(format!("command `{id}` not configured")))?;

        info!(command = %id, "issuing control action");
        let result = self.inner.executor.execute(command).await;

        if let Some(failure) = result.transport_error.clone() {
            if id == CommandId::Reboot && matches!(failure, TransportFailure::Channel(_)) {
                info!(error = %failure, "channel dropped during reboot");
                return Ok(result);
            }
            return Err(CoreError::from_transport(failure, &self.inner.peer));
        }
        if result.success {
            return Ok(result);
        }

        let stderr = result.stderr.trim();
        let message = if stderr.is_empty() {
            result
                .exit_status
                .map_or_else(|| "killed by signal".to_owned(), |s| format!("exit status {s}"))
        } else {
            stderr.to_owned()
        };
        Err(CoreError::Rejected {
            command: id,
            message,
        })
    }
}

/// Read the counters once and make sure the WAN interface exists.
async fn probe_wan(
    executor: &Executor,
    commands: &CommandSet,
    config: &MonitorConfig,
    peer: &str,
) -> Result<InterfaceCounterSample, CoreError> {
    let command = commands
        .get(CommandId::InterfaceCounters)
        .ok_or_else(|| CoreError::Internal("interface counter command missing".into()))?;

    let parsed = executor
        .execute_parsed(command, parse_interface_counters)
        .await
        .map_err(|e| match e {
            CollectError::Transport(failure) => CoreError::from_transport(failure, peer),
            other => CoreError::config(format!("cannot read interface counters on {peer}: {other}")),
        })?;

    let available: Vec<&str> = parsed.value.iter().map(|c| c.interface.as_str()).collect();
    if !available.contains(&config.lan_interface.as_str()) {
        warn!(interface = %config.lan_interface, "LAN interface not present on device");
    }

    let Some(wan) = parsed
        .value
        .iter()
        .find(|c| c.interface == config.wan_interface)
    else {
        return Err(CoreError::config(format!(
            "WAN interface `{}` not found on {peer} (available: {})",
            config.wan_interface,
            available.join(", ")
        )));
    };
    Ok(wan.clone().at(parsed.timestamp))
}
