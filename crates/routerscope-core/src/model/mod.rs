// ── Domain model ──
//
// Raw records (one per parser), derived metrics, the published snapshot
// and the query-log record types.

pub mod log;
pub mod mac;
pub mod metrics;
pub mod sample;

pub use log::{CommandResult, Outcome, QueryLogEntry};
pub use mac::MacAddress;
pub use metrics::{
    ClientDevice, ConnectionType, MetricsSnapshot, ServiceTag, SystemHealthSample, TagSummary,
    TaggedConnection, ThroughputSample,
};
pub use sample::{
    ArpEntry, Band, DhcpLeaseRecord, InterfaceCounterSample, InterfaceCounters, LinkInfo,
    LoadAverage, MemoryInfo, ObservedConnection, Protocol, WirelessStationRecord,
};
