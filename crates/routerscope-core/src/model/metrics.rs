// ── Derived metrics & the published snapshot ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use strum::{Display, EnumIter, IntoStaticStr};

use super::mac::MacAddress;
use super::sample::{
    Band, InterfaceCounterSample, LinkInfo, LoadAverage, MemoryInfo, ObservedConnection,
};
use crate::command::CommandId;

/// WAN rate between two counter samples of the same interface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSample {
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub total_mbps: f64,
    pub elapsed_secs: f64,
}

// ── Clients ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr)]
pub enum ConnectionType {
    #[serde(rename = "lan")]
    #[strum(serialize = "LAN")]
    Lan,
    #[serde(rename = "wifi")]
    #[strum(serialize = "WiFi")]
    WiFi,
}

/// A client seen in the current cycle, joined across lease, station and
/// ARP data. Unique by `mac` within one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientDevice {
    pub mac: MacAddress,
    pub display_name: String,
    pub hostname: Option<String>,
    pub ip: Option<Ipv4Addr>,
    pub connection: ConnectionType,
    pub band: Option<Band>,
    pub signal_dbm: Option<i32>,
    pub tx_bitrate_mbps: Option<f64>,
    /// Associated to an access point or present in the neighbour table.
    pub online: bool,
    pub last_seen: DateTime<Utc>,
}

// ── System health ────────────────────────────────────────────────────

/// CPU / memory / temperature. Each field is independently optional:
/// a missing temperature sensor is a normal state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemHealthSample {
    /// 1-minute load average.
    pub cpu_load: Option<f64>,
    pub load_average: Option<LoadAverage>,
    pub ram_usage_pct: Option<f64>,
    pub memory: Option<MemoryInfo>,
    pub cpu_temp_c: Option<f64>,
}

// ── Service classification ───────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr, EnumIter,
)]
pub enum ServiceTag {
    #[serde(rename = "https")]
    #[strum(serialize = "HTTPS")]
    Https,
    #[serde(rename = "ssh")]
    #[strum(serialize = "SSH")]
    Ssh,
    #[serde(rename = "speedtest")]
    #[strum(serialize = "Speedtest")]
    Speedtest,
    #[serde(rename = "other")]
    #[strum(serialize = "Other")]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedConnection {
    #[serde(flatten)]
    pub connection: ObservedConnection,
    pub tag: ServiceTag,
}

/// Count of tracked connections per tag, over the whole table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSummary {
    pub https: usize,
    pub ssh: usize,
    pub speedtest: usize,
    pub other: usize,
}

impl TagSummary {
    pub fn add(&mut self, tag: ServiceTag) {
        match tag {
            ServiceTag::Https => self.https += 1,
            ServiceTag::Ssh => self.ssh += 1,
            ServiceTag::Speedtest => self.speedtest += 1,
            ServiceTag::Other => self.other += 1,
        }
    }

    pub fn get(&self, tag: ServiceTag) -> usize {
        match tag {
            ServiceTag::Https => self.https,
            ServiceTag::Ssh => self.ssh,
            ServiceTag::Speedtest => self.speedtest,
            ServiceTag::Other => self.other,
        }
    }

    pub fn total(&self) -> usize {
        self.https + self.ssh + self.speedtest + self.other
    }
}

// ── Snapshot ─────────────────────────────────────────────────────────

/// Everything one successful poll cycle produced.
///
/// Replaced as a whole on every publish; never mutated in place. A metric
/// whose command failed to parse is `None` and its command id is listed in
/// `omitted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Monotonic cycle number, starting at 1.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// The most recent cycle failed at the transport level; every value
    /// below comes from the last good cycle.
    pub stale: bool,
    pub wan_interface: String,
    pub throughput: Option<ThroughputSample>,
    pub wan_counters: Option<InterfaceCounterSample>,
    pub lan_counters: Option<InterfaceCounterSample>,
    pub link: Option<LinkInfo>,
    pub clients: Option<Vec<ClientDevice>>,
    pub health: SystemHealthSample,
    pub latency_ms: Option<f64>,
    pub connections: Option<Vec<TaggedConnection>>,
    pub service_summary: Option<TagSummary>,
    pub omitted: Vec<CommandId>,
    pub collection_ms: u64,
}

impl MetricsSnapshot {
    pub fn client_count(&self) -> usize {
        self.clients.as_ref().map_or(0, Vec::len)
    }

    /// Copy of this snapshot flagged as stale.
    pub fn to_stale(&self) -> Self {
        Self {
            stale: true,
            ..self.clone()
        }
    }
}
