// Single-probe `ping -c 1` (busybox or iputils), stderr folded into stdout.

use crate::command::CommandId;
use crate::error::ParseError;

/// Round-trip time in milliseconds, or `None` when the probe was lost.
pub fn parse_ping(raw: &str) -> Result<Option<f64>, ParseError> {
    for line in raw.lines() {
        if let Some((_, rest)) = line.split_once("time=") {
            let ms = rest
                .split(|c: char| c.is_whitespace() || c == 'm')
                .next()
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0);
            if let Some(ms) = ms {
                return Ok(Some(ms));
            }
        }
    }
    if raw.contains("100% packet loss") {
        return Ok(None);
    }
    Err(ParseError::new(CommandId::Ping, "no reply time or loss figure", raw))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BUSYBOX: &str = "\
PING 8.8.8.8 (8.8.8.8): 56 data bytes
64 bytes from 8.8.8.8: seq=0 ttl=117 time=12.345 ms

--- 8.8.8.8 ping statistics ---
1 packets transmitted, 1 packets received, 0% packet loss
round-trip min/avg/max = 12.345/12.345/12.345 ms
";

    const LOST: &str = "\
PING 10.255.255.1 (10.255.255.1): 56 data bytes

--- 10.255.255.1 ping statistics ---
1 packets transmitted, 0 packets received, 100% packet loss
";

    #[test]
    fn parses_reply_time() {
        assert_eq!(parse_ping(BUSYBOX).unwrap(), Some(12.345));
    }

    #[test]
    fn iputils_format_without_space() {
        let raw = "64 bytes from 1.1.1.1: icmp_seq=1 ttl=57 time=9.81ms\n";
        assert_eq!(parse_ping(raw).unwrap(), Some(9.81));
    }

    #[test]
    fn total_loss_is_unreachable_not_error() {
        assert_eq!(parse_ping(LOST).unwrap(), None);
    }

    #[test]
    fn bad_address_is_an_error() {
        let err = parse_ping("ping: bad address 'nowhere.invalid'\n").unwrap_err();
        assert_eq!(err.command, CommandId::Ping);
    }
}
