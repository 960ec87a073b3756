//! Telemetry collection and normalization engine for a single router.
//!
//! This crate owns everything between the SSH channel and the consumers of
//! the data:
//!
//! - **[`Executor`]**: serializes every remote command over the one
//!   transport, applying per-command timeouts and a single reconnect on
//!   channel failure. Each call appends exactly one [`QueryLogEntry`].
//!
//! - **Parsers** ([`parser`]): pure functions turning free-text command
//!   output into typed records. Bad lines are skipped; output with nothing
//!   recognizable is a [`ParseError`], distinct from legitimately empty output.
//!
//! - **Aggregation** ([`aggregate`]): throughput from successive counter
//!   samples, client identity from leases + stations + ARP, and service tags
//!   for tracked connections.
//!
//! - **[`Scheduler`]**: the polling state machine
//!   (`Idle → Collecting → {Publishing, Backoff} → Idle`).
//!
//! - **[`SnapshotStore`]** / **[`QueryLog`]**: lock-free, copy-on-publish
//!   shared state read by any number of consumers.
//!
//! - **[`Monitor`]**: the facade tying it together: startup validation,
//!   background tasks, control actions and shutdown.

pub mod aggregate;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod model;
pub mod monitor;
pub mod parser;
pub mod scheduler;
pub mod store;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use aggregate::{ServiceClassifier, ThroughputTracker, compute_throughput, resolve_clients};
pub use command::{CommandId, CommandSet, RemoteCommand, RetryPolicy};
pub use config::MonitorConfig;
pub use error::{CollectError, CoreError, ParseError, TransportFailure};
pub use executor::{Executor, Parsed};
pub use monitor::Monitor;
pub use scheduler::{Scheduler, SchedulerState, backoff_delay};
pub use store::{QueryLog, SnapshotStore};
pub use stream::SnapshotStream;

pub use model::{
    ArpEntry, Band, ClientDevice, CommandResult, ConnectionType, DhcpLeaseRecord,
    InterfaceCounterSample, InterfaceCounters, LinkInfo, LoadAverage, MacAddress, MemoryInfo,
    MetricsSnapshot, ObservedConnection, Outcome, Protocol, QueryLogEntry, ServiceTag,
    SystemHealthSample, TagSummary, TaggedConnection, ThroughputSample, WirelessStationRecord,
};
