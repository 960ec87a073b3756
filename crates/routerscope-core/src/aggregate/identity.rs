// ── Client identity resolution ──
//
// Joins DHCP leases, wireless stations and ARP neighbours on MAC address.
// The station dump decides the connection type: present there means WiFi,
// otherwise LAN. A client is online when it is associated or has a complete
// neighbour entry; dnsmasq keeps leases long after a device has left. The
// output depends only on the input *sets*, never on input order, and
// contains each MAC at most once.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::{DateTime, Utc};

use crate::model::{
    ArpEntry, ClientDevice, ConnectionType, DhcpLeaseRecord, MacAddress, WirelessStationRecord,
};

/// Build the client list for one cycle.
///
/// ARP entries on `wan_interface`, incomplete entries and all-zero MACs are
/// ignored. `arp` is `None` when the table could not be read; this is then
/// the plain lease/station join and every lease holder counts as online.
pub fn resolve_clients(
    leases: &[DhcpLeaseRecord],
    stations: &[WirelessStationRecord],
    arp: Option<&[ArpEntry]>,
    wan_interface: &str,
    now: DateTime<Utc>,
) -> Vec<ClientDevice> {
    let mut by_lease: BTreeMap<&MacAddress, &DhcpLeaseRecord> = BTreeMap::new();
    for lease in leases {
        keep_best(&mut by_lease, &lease.mac, lease, lease_rank);
    }

    let mut by_station: BTreeMap<&MacAddress, &WirelessStationRecord> = BTreeMap::new();
    for station in stations {
        keep_best(&mut by_station, &station.mac, station, station_rank);
    }

    let mut by_arp: BTreeMap<&MacAddress, &ArpEntry> = BTreeMap::new();
    for entry in arp
        .unwrap_or_default()
        .iter()
        .filter(|e| e.complete && !e.mac.is_zero() && e.device != wan_interface)
    {
        // Lowest IP wins when one MAC answers for several addresses.
        keep_best(&mut by_arp, &entry.mac, entry, |a, b| {
            b.ip.cmp(&a.ip).then_with(|| b.device.cmp(&a.device))
        });
    }

    let mut macs: Vec<&MacAddress> = by_lease
        .keys()
        .chain(by_station.keys())
        .chain(by_arp.keys())
        .copied()
        .collect();
    macs.sort_unstable();
    macs.dedup();

    let mut clients: Vec<ClientDevice> = macs
        .into_iter()
        .map(|mac| {
            let lease = by_lease.get(mac).copied();
            let station = by_station.get(mac).copied();
            let online = station.is_some() || arp.is_none() || by_arp.contains_key(mac);
            let ip = lease
                .map(|l| l.ip)
                .or_else(|| by_arp.get(mac).map(|a| a.ip));
            let hostname = lease.and_then(|l| l.hostname.clone());
            let display_name = match (&hostname, ip) {
                (Some(name), _) => name.clone(),
                (None, Some(ip)) => format!("Unknown ({})", ip.octets()[3]),
                (None, None) => mac.to_string(),
            };

            ClientDevice {
                mac: mac.clone(),
                display_name,
                hostname,
                ip,
                connection: if station.is_some() {
                    ConnectionType::WiFi
                } else {
                    ConnectionType::Lan
                },
                band: station.and_then(|s| s.band),
                signal_dbm: station.and_then(|s| s.signal_dbm),
                tx_bitrate_mbps: station.and_then(|s| s.tx_bitrate_mbps),
                online,
                last_seen: now,
            }
        })
        .collect();

    // Online first, then known IPs ascending, then clients without an IP;
    // MAC breaks ties.
    clients.sort_by(|a, b| {
        b.online
            .cmp(&a.online)
            .then_with(|| a.ip.is_none().cmp(&b.ip.is_none()))
            .then_with(|| a.ip.cmp(&b.ip))
            .then_with(|| a.mac.cmp(&b.mac))
    });
    clients
}

/// Insert `value` unless an existing entry ranks at least as high.
fn keep_best<'a, T>(
    map: &mut BTreeMap<&'a MacAddress, &'a T>,
    mac: &'a MacAddress,
    value: &'a T,
    rank: impl Fn(&T, &T) -> Ordering,
) {
    match map.entry(mac) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
        Entry::Occupied(mut slot) => {
            if rank(value, slot.get()) == Ordering::Greater {
                slot.insert(value);
            }
        }
    }
}

/// Latest expiry wins; an infinite lease beats any finite one. The
/// remaining fields only make the order total.
fn lease_rank(a: &DhcpLeaseRecord, b: &DhcpLeaseRecord) -> Ordering {
    let expiry = |l: &DhcpLeaseRecord| (l.expires.is_none(), l.expires);
    expiry(a)
        .cmp(&expiry(b))
        .then_with(|| b.ip.cmp(&a.ip))
        .then_with(|| a.hostname.cmp(&b.hostname))
}

/// Strongest signal wins (unknown signal loses), then fastest link.
fn station_rank(a: &WirelessStationRecord, b: &WirelessStationRecord) -> Ordering {
    a.signal_dbm
        .cmp(&b.signal_dbm)
        .then_with(|| {
            a.tx_bitrate_mbps
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&b.tx_bitrate_mbps.unwrap_or(f64::NEG_INFINITY))
        })
        .then_with(|| a.band.cmp(&b.band))
        .then_with(|| b.interface.cmp(&a.interface))
}
