// `/proc/net/dev`
//
//   Inter-|   Receive                            |  Transmit
//    face |bytes    packets errs drop fifo frame ...|bytes    packets ...
//     eth0: 1234567  8910    0    0    0     0   ...  7654321  4321 ...
//
// Receive bytes is the first field after the colon, transmit bytes the ninth.

use crate::command::CommandId;
use crate::error::ParseError;
use crate::model::InterfaceCounters;

use super::finish_list;

pub fn parse_interface_counters(raw: &str) -> Result<Vec<InterfaceCounters>, ParseError> {
    let mut rows = Vec::new();
    let mut recognized = 0;

    for line in raw.lines() {
        let Some((name, stats)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            continue;
        }
        let fields: Vec<&str> = stats.split_whitespace().collect();
        let rx = fields.first().and_then(|f| f.parse::<u64>().ok());
        let tx = fields.get(8).and_then(|f| f.parse::<u64>().ok());
        if let (Some(rx_bytes), Some(tx_bytes)) = (rx, tx) {
            recognized += 1;
            rows.push(InterfaceCounters {
                interface: name.to_owned(),
                rx_bytes,
                tx_bytes,
            });
        }
    }

    finish_list(CommandId::InterfaceCounters, raw, rows, recognized)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:   48380     496    0    0    0     0          0         0    48380     496    0    0    0     0       0          0
  eth0: 2890118212 2419811    0   12    0     0          0      1042 353478234 1180243    0    0    0     0       0          0
br-lan:1523004  12040    0    0    0     0          0         0 98230011   71209    0    0    0     0       0          0
";

    #[test]
    fn parses_every_interface() {
        let rows = parse_interface_counters(SAMPLE).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[1],
            InterfaceCounters {
                interface: "eth0".into(),
                rx_bytes: 2_890_118_212,
                tx_bytes: 353_478_234,
            }
        );
        assert_eq!(rows[2].interface, "br-lan");
        assert_eq!(rows[2].rx_bytes, 1_523_004);
    }

    #[test]
    fn short_rows_are_skipped() {
        let raw = "  eth0: 1 2 3\n  eth1: 10 0 0 0 0 0 0 0 20 0 0 0 0 0 0 0\n";
        let rows = parse_interface_counters(raw).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].interface, "eth1");
    }

    #[test]
    fn headers_only_is_a_parse_error() {
        let raw = "Inter-|   Receive |  Transmit\n face |bytes packets|bytes packets\n";
        let err = parse_interface_counters(raw).unwrap_err();
        assert_eq!(err.command, CommandId::InterfaceCounters);
        assert_eq!(err.raw_len, raw.len());
    }

    #[test]
    fn truncated_output_keeps_complete_rows() {
        let cut = &SAMPLE[..SAMPLE.find("br-lan").unwrap() + 12];
        let rows = parse_interface_counters(cut).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
