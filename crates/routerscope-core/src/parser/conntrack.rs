// `/proc/net/nf_conntrack` (or the older `/proc/net/ip_conntrack`).
//
// nf_conntrack prefixes each line with the L3 family:
//   ipv4     2 tcp      6 431999 ESTABLISHED src=.. dst=.. sport=.. dport=.. packets=.. bytes=.. src=.. ...
// ip_conntrack starts directly at the protocol. The first src/dst/sport/dport
// tuple is the original direction; the second is the reply.

use std::net::IpAddr;

use crate::command::CommandId;
use crate::error::ParseError;
use crate::model::{ObservedConnection, Protocol};

use super::finish_list;

pub fn parse_conntrack(raw: &str) -> Result<Vec<ObservedConnection>, ParseError> {
    let connections: Vec<ObservedConnection> = raw.lines().filter_map(parse_line).collect();
    let recognized = connections.len();
    finish_list(CommandId::Conntrack, raw, connections, recognized)
}

fn parse_line(line: &str) -> Option<ObservedConnection> {
    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    let protocol = if first == "ipv4" || first == "ipv6" {
        tokens.next()?; // family number
        tokens.next()?
    } else {
        first
    };

    let mut src = None;
    let mut dst = None;
    let mut src_port = None;
    let mut dst_port = None;
    let mut bytes = 0u64;

    for token in tokens {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        match key {
            "src" if src.is_none() => src = value.parse::<IpAddr>().ok(),
            "dst" if dst.is_none() => dst = value.parse::<IpAddr>().ok(),
            "sport" if src_port.is_none() => src_port = value.parse::<u16>().ok(),
            "dport" if dst_port.is_none() => dst_port = value.parse::<u16>().ok(),
            "bytes" => bytes = bytes.saturating_add(value.parse::<u64>().unwrap_or(0)),
            _ => {}
        }
    }

    Some(ObservedConnection {
        protocol: Protocol::from_name(protocol),
        src: src?,
        dst: dst?,
        src_port,
        dst_port,
        bytes,
    })
}
