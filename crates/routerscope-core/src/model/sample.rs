// ── Raw records ──
//
// One type per command family, exactly as the parsers produce them.
// Nothing here is derived; see `metrics` for computed values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use strum::{Display, IntoStaticStr};

use super::mac::MacAddress;

// ── Interface counters ───────────────────────────────────────────────

/// One row of `/proc/net/dev`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceCounters {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl InterfaceCounters {
    /// Stamp the counters with the time they were read.
    pub fn at(self, timestamp: DateTime<Utc>) -> InterfaceCounterSample {
        InterfaceCounterSample {
            interface: self.interface,
            rx_bytes: self.rx_bytes,
            tx_bytes: self.tx_bytes,
            timestamp,
        }
    }
}

/// Byte counters of one interface at one instant. Two of these (same
/// interface) make a throughput sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceCounterSample {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub timestamp: DateTime<Utc>,
}

// ── Link info ────────────────────────────────────────────────────────

/// Physical link report from `ethtool`. Every field may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub speed_mbps: Option<u32>,
    pub duplex: Option<String>,
    pub link_detected: Option<bool>,
}

// ── Wireless ─────────────────────────────────────────────────────────

/// Wi-Fi band, derived from the radio's channel frequency.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    IntoStaticStr,
)]
pub enum Band {
    #[serde(rename = "2.4GHz")]
    #[strum(serialize = "2.4GHz")]
    TwoPointFour,
    #[serde(rename = "5GHz")]
    #[strum(serialize = "5GHz")]
    Five,
    #[serde(rename = "6GHz")]
    #[strum(serialize = "6GHz")]
    Six,
}

impl Band {
    pub fn from_frequency_mhz(freq: u32) -> Option<Self> {
        match freq {
            2400..=2500 => Some(Self::TwoPointFour),
            4900..=5924 => Some(Self::Five),
            5925..=7125 => Some(Self::Six),
            _ => None,
        }
    }
}

/// One associated station from `iw dev <if> station dump`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirelessStationRecord {
    pub mac: MacAddress,
    pub interface: String,
    pub band: Option<Band>,
    pub signal_dbm: Option<i32>,
    pub tx_bitrate_mbps: Option<f64>,
}

// ── DHCP / ARP ───────────────────────────────────────────────────────

/// One dnsmasq lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhcpLeaseRecord {
    pub mac: MacAddress,
    pub ip: Ipv4Addr,
    pub hostname: Option<String>,
    /// `None` for infinite leases.
    pub expires: Option<DateTime<Utc>>,
}

/// One neighbour from `/proc/net/arp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArpEntry {
    pub ip: Ipv4Addr,
    pub mac: MacAddress,
    pub device: String,
    /// `ATF_COM` flag: the hardware address is resolved.
    pub complete: bool,
}

// ── System ───────────────────────────────────────────────────────────

/// Memory figures in kB, from `/proc/meminfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total_kb: u64,
    pub available_kb: u64,
}

impl MemoryInfo {
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn usage_pct(&self) -> f64 {
        if self.total_kb == 0 {
            return 0.0;
        }
        let used = self.total_kb.saturating_sub(self.available_kb);
        used as f64 / self.total_kb as f64 * 100.0
    }
}

/// `/proc/loadavg`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

// ── Connection tracking ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Other,
}

impl Protocol {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "tcp" => Self::Tcp,
            "udp" => Self::Udp,
            "icmp" | "icmpv6" => Self::Icmp,
            _ => Self::Other,
        }
    }
}

/// One flow from the conntrack table, original direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedConnection {
    pub protocol: Protocol,
    pub src: IpAddr,
    pub dst: IpAddr,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    /// Bytes in both directions (0 when conntrack accounting is off).
    pub bytes: u64,
}
