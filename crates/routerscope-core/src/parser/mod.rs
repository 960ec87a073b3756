//! Output parsers, one per command family.
//!
//! Every parser is a pure `fn(&str) -> Result<T, ParseError>` over the
//! literal output of the command in [`CommandSet`](crate::CommandSet).
//! Shared rules:
//!
//! - a line that does not match is skipped, never fatal;
//! - blank output is a valid empty result for list-shaped data (no
//!   stations associated, no leases, no tracked connections);
//! - non-blank output with zero recognized lines is a [`ParseError`].

mod conntrack;
mod counters;
mod leases;
mod ping;
mod system;
mod wireless;

pub use conntrack::parse_conntrack;
pub use counters::parse_interface_counters;
pub use leases::{parse_arp_table, parse_dhcp_leases};
pub use ping::parse_ping;
pub use system::{parse_cpu_temperature, parse_link_info, parse_load_average, parse_memory};
pub use wireless::parse_station_dump;

use crate::command::CommandId;
use crate::error::ParseError;

fn is_blank(raw: &str) -> bool {
    raw.trim().is_empty()
}

/// Result for list-shaped parsers once every line has been tried.
fn finish_list<T>(
    command: CommandId,
    raw: &str,
    records: Vec<T>,
    recognized: usize,
) -> Result<Vec<T>, ParseError> {
    if recognized == 0 && !is_blank(raw) {
        Err(ParseError::new(command, "no recognizable lines", raw))
    } else {
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn parsers_never_panic(raw in "\\PC{0,400}") {
            let _ = parse_interface_counters(&raw);
            let _ = parse_link_info(&raw);
            let _ = parse_station_dump(&raw);
            let _ = parse_dhcp_leases(&raw);
            let _ = parse_arp_table(&raw);
            let _ = parse_cpu_temperature(&raw);
            let _ = parse_memory(&raw);
            let _ = parse_load_average(&raw);
            let _ = parse_conntrack(&raw);
            let _ = parse_ping(&raw);
        }

        #[test]
        fn blank_list_output_is_empty(raw in "[ \\t\\n]{0,20}") {
            prop_assert!(parse_station_dump(&raw).is_ok_and(|v| v.is_empty()));
            prop_assert!(parse_dhcp_leases(&raw).is_ok_and(|v| v.is_empty()));
            prop_assert!(parse_conntrack(&raw).is_ok_and(|v| v.is_empty()));
        }
    }
}
