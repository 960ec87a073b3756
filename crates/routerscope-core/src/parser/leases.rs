// dnsmasq lease file and the kernel ARP table.

use std::net::Ipv4Addr;

use chrono::DateTime;

use crate::command::CommandId;
use crate::error::ParseError;
use crate::model::{ArpEntry, DhcpLeaseRecord, MacAddress};

use super::finish_list;

/// ATF_COM in `/proc/net/arp` flags.
const ARP_COMPLETE: u32 = 0x2;

/// `/tmp/dhcp.leases`:
///
/// ```text
/// 1718042000 aa:bb:cc:dd:ee:ff 192.168.1.50 laptop 01:aa:bb:cc:dd:ee:ff
/// 0 11:22:33:44:55:66 192.168.1.60 * *
/// ```
///
/// Expiry `0` means an infinite lease; hostname `*` means none was sent.
/// IPv6 lines (`duid ...` or IAID in the MAC column) are skipped.
pub fn parse_dhcp_leases(raw: &str) -> Result<Vec<DhcpLeaseRecord>, ParseError> {
    let mut leases = Vec::new();

    for line in raw.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [expiry, mac, ip, hostname, ..] = fields.as_slice() else {
            continue;
        };
        let Ok(expiry) = expiry.parse::<i64>() else {
            continue;
        };
        let Some(mac) = MacAddress::parse(mac) else {
            continue;
        };
        let Ok(ip) = ip.parse::<Ipv4Addr>() else {
            continue;
        };
        let hostname = (*hostname != "*").then(|| (*hostname).to_owned());
        let expires = if expiry == 0 {
            None
        } else {
            DateTime::from_timestamp(expiry, 0)
        };
        leases.push(DhcpLeaseRecord {
            mac,
            ip,
            hostname,
            expires,
        });
    }

    let recognized = leases.len();
    finish_list(CommandId::DhcpLeases, raw, leases, recognized)
}

/// `/proc/net/arp`:
///
/// ```text
/// IP address       HW type     Flags       HW address            Mask     Device
/// 192.168.1.50     0x1         0x2         aa:bb:cc:dd:ee:ff     *        br-lan
/// ```
///
/// The kernel always prints the header, so header-only output is a router
/// with no neighbours rather than garbage.
pub fn parse_arp_table(raw: &str) -> Result<Vec<ArpEntry>, ParseError> {
    let mut entries = Vec::new();
    let mut header_seen = false;

    for line in raw.lines() {
        if is_arp_header(line) {
            header_seen = true;
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [ip, _hw_type, flags, mac, _mask, device, ..] = fields.as_slice() else {
            continue;
        };
        let Ok(ip) = ip.parse::<Ipv4Addr>() else {
            continue;
        };
        let Some(flags) = flags
            .strip_prefix("0x")
            .and_then(|f| u32::from_str_radix(f, 16).ok())
        else {
            continue;
        };
        let Some(mac) = MacAddress::parse(mac) else {
            continue;
        };
        entries.push(ArpEntry {
            ip,
            mac,
            device: (*device).to_owned(),
            complete: flags & ARP_COMPLETE != 0,
        });
    }

    let recognized = entries.len() + usize::from(header_seen);
    finish_list(CommandId::ArpTable, raw, entries, recognized)
}

fn is_arp_header(line: &str) -> bool {
    let line = line.trim();
    line.starts_with("IP address") && line.ends_with("Device")
}
