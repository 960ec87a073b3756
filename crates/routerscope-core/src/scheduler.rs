// ── Poll scheduler ──
//
// One background task running `Idle → Collecting → {Publishing, Backoff}
// → Idle` on a fixed interval. Every per-cycle failure ends here: a
// required command that fails at the transport level marks the current
// snapshot stale and backs off; anything else just omits a metric.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregate::{DEFAULT_CONNECTION_LIMIT, ServiceClassifier, ThroughputTracker, resolve_clients};
use crate::command::{CommandId, CommandSet};
use crate::config::MonitorConfig;
use crate::error::{CollectError, ParseError, TransportFailure};
use crate::executor::{Executor, Parsed};
use crate::model::{
    InterfaceCounterSample, InterfaceCounters, MetricsSnapshot, SystemHealthSample,
};
use crate::parser::{
    parse_arp_table, parse_conntrack, parse_cpu_temperature, parse_dhcp_leases,
    parse_interface_counters, parse_link_info, parse_load_average, parse_memory, parse_ping,
    parse_station_dump,
};
use crate::store::SnapshotStore;

// ── SchedulerState ───────────────────────────────────────────────────

/// Observable phase of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Collecting,
    Publishing,
    /// Waiting `delay` after the `attempt`-th consecutive failed cycle.
    Backoff { attempt: u32, delay: Duration },
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Collecting => f.write_str("collecting"),
            Self::Publishing => f.write_str("publishing"),
            Self::Backoff { attempt, delay } => {
                write!(f, "backoff (attempt {attempt}, retry in {}s)", delay.as_secs())
            }
        }
    }
}

/// Delay before retrying after the `attempt`-th consecutive failure:
/// `base * 2^(attempt - 1)`, capped at `max`.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    base.checked_mul(1_u32 << exponent)
        .map_or(max, |delay| delay.min(max))
}

/// A required command failed at the transport level; the cycle is void.
#[derive(Debug)]
struct CycleFailure {
    command: CommandId,
    failure: TransportFailure,
}

// ── Scheduler ────────────────────────────────────────────────────────

/// Owns the aggregation state carried between cycles. Consumed by
/// [`run`](Self::run).
pub struct Scheduler {
    executor: Executor,
    commands: CommandSet,
    store: Arc<SnapshotStore>,
    state: watch::Sender<SchedulerState>,
    tracker: ThroughputTracker,
    classifier: ServiceClassifier,
    wan_interface: String,
    lan_interface: String,
    poll_interval: Duration,
    backoff_base: Duration,
    backoff_max: Duration,
    sequence: u64,
}

impl Scheduler {
    pub fn new(
        config: &MonitorConfig,
        executor: Executor,
        commands: CommandSet,
        store: Arc<SnapshotStore>,
        state: watch::Sender<SchedulerState>,
    ) -> Self {
        Self {
            executor,
            commands,
            store,
            state,
            tracker: ThroughputTracker::new(),
            classifier: ServiceClassifier::new(
                config.speedtest_ports.iter().copied(),
                config.speedtest_min_bytes,
            ),
            wan_interface: config.wan_interface.clone(),
            lan_interface: config.lan_interface.clone(),
            poll_interval: config.poll_interval,
            backoff_base: config.backoff_base,
            backoff_max: config.backoff_max,
            sequence: 0,
        }
    }

    /// Use `sample` as the throughput baseline, so the first published
    /// snapshot already carries a rate.
    pub fn seed_baseline(&mut self, sample: InterfaceCounterSample) {
        let _ = self.tracker.observe(sample);
    }

    /// Poll until `cancel` fires. A cycle that has started always runs to
    /// completion; cancellation is checked between cycles and during
    /// backoff.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // consume the immediate first tick

        let mut failures: u32 = 0;
        info!(interval = ?self.poll_interval, "scheduler started");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            self.set_state(SchedulerState::Collecting);
            match self.collect().await {
                Ok(snapshot) => {
                    if failures > 0 {
                        info!(failures, "device reachable again");
                    }
                    failures = 0;
                    self.set_state(SchedulerState::Publishing);
                    let published = self.store.publish(snapshot);
                    debug!(
                        sequence = published.sequence,
                        clients = published.client_count(),
                        omitted = published.omitted.len(),
                        collection_ms = published.collection_ms,
                        "snapshot published"
                    );
                }
                Err(CycleFailure { command, failure }) => {
                    failures = failures.saturating_add(1);
                    let delay = backoff_delay(failures, self.backoff_base, self.backoff_max);
                    self.store.mark_stale();
                    warn!(
                        command = %command,
                        error = %failure,
                        attempt = failures,
                        delay = ?delay,
                        "poll cycle failed, backing off"
                    );
                    self.set_state(SchedulerState::Backoff {
                        attempt: failures,
                        delay,
                    });

                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                    interval.reset_immediately();
                }
            }
            self.set_state(SchedulerState::Idle);
        }

        self.set_state(SchedulerState::Idle);
        info!("scheduler stopped");
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }

    // ── One cycle ────────────────────────────────────────────────────

    async fn collect(&mut self) -> Result<MetricsSnapshot, CycleFailure> {
        let started = Instant::now();
        let mut omitted = Vec::new();

        let counters = self
            .fetch(CommandId::InterfaceCounters, parse_interface_counters, &mut omitted)
            .await?;
        let link = self
            .fetch(CommandId::LinkInfo, parse_link_info, &mut omitted)
            .await?;
        let stations = self
            .fetch(CommandId::StationDump, parse_station_dump, &mut omitted)
            .await?;
        let leases = self
            .fetch(CommandId::DhcpLeases, parse_dhcp_leases, &mut omitted)
            .await?;
        let arp = self
            .fetch(CommandId::ArpTable, parse_arp_table, &mut omitted)
            .await?;
        let temperature = self
            .fetch(CommandId::CpuTemperature, parse_cpu_temperature, &mut omitted)
            .await?;
        let memory = self
            .fetch(CommandId::Memory, parse_memory, &mut omitted)
            .await?;
        let load = self
            .fetch(CommandId::LoadAverage, parse_load_average, &mut omitted)
            .await?;
        let conntrack = self
            .fetch(CommandId::Conntrack, parse_conntrack, &mut omitted)
            .await?;
        let latency = self.fetch(CommandId::Ping, parse_ping, &mut omitted).await?;

        let (wan_counters, lan_counters) = match counters {
            Some(parsed) => self.split_counters(parsed),
            None => (None, None),
        };
        if wan_counters.is_none() && !omitted.contains(&CommandId::InterfaceCounters) {
            warn!(interface = %self.wan_interface, "WAN interface missing from counters");
            omitted.push(CommandId::InterfaceCounters);
        }
        let throughput = wan_counters
            .clone()
            .and_then(|sample| self.tracker.observe(sample));

        let now = Utc::now();
        let clients = match (leases, stations) {
            (Some(leases), Some(stations)) => Some(resolve_clients(
                &leases.value,
                &stations.value,
                arp.as_ref().map(|a| a.value.as_slice()),
                &self.wan_interface,
                now,
            )),
            _ => None,
        };

        let health = SystemHealthSample {
            cpu_load: load.as_ref().map(|l| l.value.one),
            load_average: load.map(|l| l.value),
            ram_usage_pct: memory.as_ref().map(|m| m.value.usage_pct()),
            memory: memory.map(|m| m.value),
            cpu_temp_c: temperature.and_then(|t| t.value),
        };

        let (connections, service_summary) = match conntrack {
            Some(parsed) => {
                let (tagged, summary) = self
                    .classifier
                    .tag_all(&parsed.value, DEFAULT_CONNECTION_LIMIT);
                (Some(tagged), Some(summary))
            }
            None => (None, None),
        };

        self.sequence += 1;
        Ok(MetricsSnapshot {
            sequence: self.sequence,
            timestamp: now,
            stale: false,
            wan_interface: self.wan_interface.clone(),
            throughput,
            wan_counters,
            lan_counters,
            link: link.map(|l| l.value),
            clients,
            health,
            latency_ms: latency.and_then(|l| l.value),
            connections,
            service_summary,
            omitted,
            collection_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// Run one polled command. `Ok(None)` means the metric is omitted for
    /// this cycle (or the command is not configured at all).
    async fn fetch<T, F>(
        &self,
        id: CommandId,
        parser: F,
        omitted: &mut Vec<CommandId>,
    ) -> Result<Option<Parsed<T>>, CycleFailure>
    where
        T: Send + 'static,
        F: FnOnce(&str) -> Result<T, ParseError> + Send + 'static,
    {
        let Some(command) = self.commands.get(id) else {
            return Ok(None);
        };
        match self.executor.execute_parsed(command, parser).await {
            Ok(parsed) => Ok(Some(parsed)),
            Err(CollectError::Transport(failure)) if command.required => {
                Err(CycleFailure { command: id, failure })
            }
            Err(e) => {
                debug!(command = %id, error = %e, "metric omitted");
                omitted.push(id);
                Ok(None)
            }
        }
    }

    fn split_counters(
        &self,
        parsed: Parsed<Vec<InterfaceCounters>>,
    ) -> (Option<InterfaceCounterSample>, Option<InterfaceCounterSample>) {
        let Parsed { value, timestamp } = parsed;
        let mut wan = None;
        let mut lan = None;
        for counters in value {
            if counters.interface == self.wan_interface {
                wan = Some(counters.at(timestamp));
            } else if counters.interface == self.lan_interface {
                lan = Some(counters.at(timestamp));
            }
        }
        (wan, lan)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::QueryLog;
    use crate::model::Outcome;
    use crate::testing::{ARP_HEADER, FakeTransport, Reply};
    use pretty_assertions::assert_eq;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let delays: Vec<Duration> = (1..=7)
            .map(|attempt| backoff_delay(attempt, secs(2), secs(60)))
            .collect();
        assert_eq!(
            delays,
            vec![secs(2), secs(4), secs(8), secs(16), secs(32), secs(60), secs(60)]
        );
    }

    #[test]
    fn backoff_never_overflows() {
        assert_eq!(backoff_delay(u32::MAX, secs(2), secs(60)), secs(60));
        assert_eq!(backoff_delay(0, secs(2), secs(60)), secs(2));
    }

    #[test]
    fn state_display() {
        let state = SchedulerState::Backoff {
            attempt: 3,
            delay: secs(8),
        };
        assert_eq!(state.to_string(), "backoff (attempt 3, retry in 8s)");
        assert_eq!(SchedulerState::Collecting.to_string(), "collecting");
    }

    struct Harness {
        fake: FakeTransport,
        store: Arc<SnapshotStore>,
        log: Arc<QueryLog>,
        state: watch::Receiver<SchedulerState>,
        cancel: CancellationToken,
        handle: tokio::task::JoinHandle<()>,
    }

    fn start(fake: &FakeTransport) -> Harness {
        let config = MonitorConfig::default();
        let log = Arc::new(QueryLog::new(config.log_capacity));
        let (executor, _executor_task) =
            Executor::spawn(fake.clone(), Arc::clone(&log), CancellationToken::new());
        let store = Arc::new(SnapshotStore::new(config.history_size));
        let (state_tx, state) = watch::channel(SchedulerState::Idle);
        let scheduler = Scheduler::new(
            &config,
            executor,
            CommandSet::from_config(&config),
            Arc::clone(&store),
            state_tx,
        );
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));
        Harness {
            fake: fake.clone(),
            store,
            log,
            state,
            cancel,
            handle,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_publishes_a_full_snapshot() {
        let h = start(&FakeTransport::healthy_router());
        let mut stream = h.store.subscribe();

        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.sequence, 1);
        assert!(!snap.stale);
        assert!(snap.throughput.is_none(), "no baseline before the first cycle");
        assert_eq!(snap.wan_counters.as_ref().unwrap().rx_bytes, 1_000_000);
        assert_eq!(snap.lan_counters.as_ref().unwrap().interface, "br-lan");
        assert_eq!(snap.client_count(), 2);
        assert!((snap.latency_ms.unwrap() - 12.5).abs() < 1e-9);
        assert!((snap.health.cpu_temp_c.unwrap() - 51.0).abs() < 1e-9);
        assert!((snap.health.cpu_load.unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(snap.connections.as_deref(), Some(&[][..]));
        assert!(snap.omitted.is_empty(), "omitted: {:?}", snap.omitted);
        assert!(snap.clients.as_ref().unwrap().iter().all(|c| c.online));

        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.sequence, 2);
        assert_eq!(h.store.history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn parse_failures_omit_only_their_metric() {
        let fake = FakeTransport::healthy_router();
        fake.reply("/proc/meminfo", Reply::ok("garbage\n"));
        fake.reply("ping", Reply::ok("1 packets transmitted, 0 received, 100% packet loss\n"));
        let h = start(&fake);

        let snap = h.store.subscribe().changed().await.unwrap();
        assert!(!snap.stale);
        assert_eq!(snap.omitted, vec![CommandId::Memory]);
        assert!(snap.health.memory.is_none());
        assert!(snap.health.load_average.is_some());
        assert_eq!(snap.latency_ms, None, "unreachable target is a reading, not an omission");
    }

    #[tokio::test(start_paused = true)]
    async fn router_without_neighbours_is_not_a_parse_error() {
        let fake = FakeTransport::healthy_router();
        fake.reply("/proc/net/arp", Reply::ok(ARP_HEADER));
        let h = start(&fake);

        let snap = h.store.subscribe().changed().await.unwrap();
        assert!(snap.omitted.is_empty(), "omitted: {:?}", snap.omitted);
        assert_eq!(snap.client_count(), 2);

        let arp_log: Vec<Outcome> = h
            .log
            .entries()
            .iter()
            .filter(|e| e.command == CommandId::ArpTable)
            .map(|e| e.outcome)
            .collect();
        assert_eq!(arp_log[0], Outcome::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn required_transport_failure_marks_stale_then_recovers() {
        let h = start(&FakeTransport::healthy_router());
        let mut stream = h.store.subscribe();
        let first = stream.changed().await.unwrap();

        h.fake.set_down(true);
        let mut state = h.state.clone();
        let _ = state
            .wait_for(|s| matches!(s, SchedulerState::Backoff { attempt: 1, .. }))
            .await
            .unwrap();

        let stale = h.store.current().unwrap();
        assert!(stale.stale);
        assert_eq!(stale.sequence, first.sequence);
        assert_eq!(stale.clients, first.clients);
        assert_eq!(stale.throughput, first.throughput);

        h.fake.set_down(false);
        let recovered = loop {
            let snap = stream.changed().await.unwrap();
            if !snap.stale {
                break snap;
            }
        };
        assert_eq!(recovered.sequence, first.sequence + 1);
        assert!(h.fake.reconnects() >= 2);
        assert_eq!(h.store.history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_failures_grow_the_delay() {
        let fake = FakeTransport::healthy_router();
        fake.set_down(true);
        let h = start(&fake);

        let mut state = h.state.clone();
        let _ = state
            .wait_for(|s| matches!(s, SchedulerState::Backoff { attempt: 3, .. }))
            .await
            .unwrap();
        assert_eq!(
            *state.borrow(),
            SchedulerState::Backoff {
                attempt: 3,
                delay: secs(8)
            }
        );
        assert!(h.store.current().is_none(), "nothing published yet");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_backoff_stops_promptly() {
        let fake = FakeTransport::healthy_router();
        fake.set_down(true);
        let h = start(&fake);

        let mut state = h.state.clone();
        let _ = state
            .wait_for(|s| matches!(s, SchedulerState::Backoff { .. }))
            .await
            .unwrap();
        h.cancel.cancel();
        h.handle.await.unwrap();
        assert_eq!(*state.borrow(), SchedulerState::Idle);
    }
}
