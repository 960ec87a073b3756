// ── Service tag classifier ──
//
// Explicit port matches first, then the speedtest heuristic, then Other.

use std::collections::BTreeSet;

use crate::model::{ObservedConnection, Protocol, ServiceTag, TagSummary, TaggedConnection};

/// How many connections a snapshot carries (largest by bytes).
pub const DEFAULT_CONNECTION_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct ServiceClassifier {
    speedtest_ports: BTreeSet<u16>,
    speedtest_min_bytes: u64,
}

impl ServiceClassifier {
    pub fn new(speedtest_ports: impl IntoIterator<Item = u16>, speedtest_min_bytes: u64) -> Self {
        Self {
            speedtest_ports: speedtest_ports.into_iter().collect(),
            speedtest_min_bytes,
        }
    }

    pub fn classify(&self, conn: &ObservedConnection) -> ServiceTag {
        match (conn.protocol, conn.dst_port) {
            (Protocol::Tcp, Some(443)) => ServiceTag::Https,
            (Protocol::Tcp, Some(22)) => ServiceTag::Ssh,
            (_, Some(port))
                if self.speedtest_ports.contains(&port) && conn.bytes >= self.speedtest_min_bytes =>
            {
                ServiceTag::Speedtest
            }
            _ => ServiceTag::Other,
        }
    }

    /// Tag every connection; keep the `limit` largest (ties broken by
    /// endpoints so the result is stable) and count all of them.
    pub fn tag_all(
        &self,
        connections: &[ObservedConnection],
        limit: usize,
    ) -> (Vec<TaggedConnection>, TagSummary) {
        let mut summary = TagSummary::default();
        let mut tagged: Vec<TaggedConnection> = connections
            .iter()
            .map(|conn| {
                let tag = self.classify(conn);
                summary.add(tag);
                TaggedConnection {
                    connection: conn.clone(),
                    tag,
                }
            })
            .collect();

        tagged.sort_by(|a, b| {
            let (a, b) = (&a.connection, &b.connection);
            b.bytes
                .cmp(&a.bytes)
                .then_with(|| a.src.cmp(&b.src))
                .then_with(|| a.dst.cmp(&b.dst))
                .then_with(|| a.src_port.cmp(&b.src_port))
                .then_with(|| a.dst_port.cmp(&b.dst_port))
        });
        tagged.truncate(limit);
        (tagged, summary)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn conn(protocol: Protocol, dport: u16, bytes: u64) -> ObservedConnection {
        ObservedConnection {
            protocol,
            src: "192.168.1.50".parse().unwrap(),
            dst: "203.0.113.10".parse().unwrap(),
            src_port: Some(50_000),
            dst_port: Some(dport),
            bytes,
        }
    }

    fn classifier() -> ServiceClassifier {
        ServiceClassifier::new([8080, 5060], 10 * 1024 * 1024)
    }

    #[test]
    fn explicit_ports() {
        let c = classifier();
        assert_eq!(c.classify(&conn(Protocol::Tcp, 443, 10)), ServiceTag::Https);
        assert_eq!(c.classify(&conn(Protocol::Tcp, 22, 10)), ServiceTag::Ssh);
        assert_eq!(c.classify(&conn(Protocol::Udp, 443, 10)), ServiceTag::Other);
    }

    #[test]
    fn speedtest_needs_port_and_volume() {
        let c = classifier();
        assert_eq!(c.classify(&conn(Protocol::Tcp, 8080, 50_000_000)), ServiceTag::Speedtest);
        assert_eq!(c.classify(&conn(Protocol::Tcp, 8080, 1_000)), ServiceTag::Other);
        assert_eq!(c.classify(&conn(Protocol::Tcp, 9000, 50_000_000)), ServiceTag::Other);
    }

    #[test]
    fn explicit_match_beats_heuristic() {
        let c = ServiceClassifier::new([443], 0);
        assert_eq!(c.classify(&conn(Protocol::Tcp, 443, 50_000_000)), ServiceTag::Https);
    }

    #[test]
    fn portless_connections_are_other() {
        let mut icmp = conn(Protocol::Icmp, 0, 64);
        icmp.dst_port = None;
        assert_eq!(classifier().classify(&icmp), ServiceTag::Other);
    }

    #[test]
    fn tag_all_truncates_but_counts_everything() {
        let conns = vec![
            conn(Protocol::Tcp, 443, 100),
            conn(Protocol::Tcp, 22, 5_000),
            conn(Protocol::Udp, 53, 60),
        ];
        let (tagged, summary) = classifier().tag_all(&conns, 2);
        assert_eq!(tagged.len(), 2);
        assert_eq!(tagged[0].tag, ServiceTag::Ssh);
        assert_eq!(tagged[1].tag, ServiceTag::Https);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.other, 1);
    }
}
