// System status: link info, temperature, memory, load average.

use crate::command::CommandId;
use crate::error::ParseError;
use crate::model::{LinkInfo, LoadAverage, MemoryInfo};

use super::is_blank;

/// Raw sensor values below this are whole degrees; above, millidegrees.
const MILLIDEGREE_THRESHOLD: f64 = 200.0;

/// `ethtool <if>`. Blank output (no ethtool on the device) is an empty
/// report, not an error.
pub fn parse_link_info(raw: &str) -> Result<LinkInfo, ParseError> {
    let mut info = LinkInfo::default();
    let mut recognized = 0;

    for line in raw.lines() {
        let line = line.trim();
        if line.starts_with("Settings for ") {
            recognized += 1;
        } else if let Some(rest) = line.strip_prefix("Speed:") {
            recognized += 1;
            // `1000Mb/s`, or `Unknown!` with no cable
            info.speed_mbps = rest.trim().strip_suffix("Mb/s").and_then(|s| s.parse().ok());
        } else if let Some(rest) = line.strip_prefix("Duplex:") {
            recognized += 1;
            let duplex = rest.trim();
            if !duplex.is_empty() && !duplex.starts_with("Unknown") {
                info.duplex = Some(duplex.to_owned());
            }
        } else if let Some(rest) = line.strip_prefix("Link detected:") {
            recognized += 1;
            info.link_detected = match rest.trim() {
                "yes" => Some(true),
                "no" => Some(false),
                _ => None,
            };
        }
    }

    if recognized == 0 && !is_blank(raw) {
        return Err(ParseError::new(
            CommandId::LinkInfo,
            "no ethtool fields found",
            raw,
        ));
    }
    Ok(info)
}

/// First line of a thermal zone / hwmon file, or `unsupported`.
///
/// Returns `None` when no sensor exists.
pub fn parse_cpu_temperature(raw: &str) -> Result<Option<f64>, ParseError> {
    let Some(line) = raw.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return Ok(None);
    };
    if line.eq_ignore_ascii_case("unsupported") {
        return Ok(None);
    }
    let value: f64 = line
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| ParseError::new(CommandId::CpuTemperature, "not a number", raw))?;

    if value.abs() < MILLIDEGREE_THRESHOLD {
        Ok(Some(value))
    } else {
        Ok(Some(value / 1000.0))
    }
}

/// `/proc/meminfo`. Uses `MemAvailable` when the kernel provides it,
/// otherwise approximates it as `MemFree + Buffers + Cached`.
pub fn parse_memory(raw: &str) -> Result<MemoryInfo, ParseError> {
    let mut total = None;
    let mut available = None;
    let mut free = 0u64;
    let mut buffers = 0u64;
    let mut cached = 0u64;

    for line in raw.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(kb) = parse_kb(rest) else {
            continue;
        };
        match key.trim() {
            "MemTotal" => total = Some(kb),
            "MemAvailable" => available = Some(kb),
            "MemFree" => free = kb,
            "Buffers" => buffers = kb,
            "Cached" => cached = kb,
            _ => {}
        }
    }

    let total_kb = total
        .filter(|t| *t > 0)
        .ok_or_else(|| ParseError::new(CommandId::Memory, "MemTotal not found", raw))?;
    let available_kb = available
        .unwrap_or_else(|| free.saturating_add(buffers).saturating_add(cached))
        .min(total_kb);

    Ok(MemoryInfo {
        total_kb,
        available_kb,
    })
}

fn parse_kb(value: &str) -> Option<u64> {
    value.split_whitespace().next()?.parse().ok()
}

/// `/proc/loadavg`: `0.42 0.35 0.30 1/123 4567`.
pub fn parse_load_average(raw: &str) -> Result<LoadAverage, ParseError> {
    raw.lines()
        .find_map(|line| {
            let mut fields = line.split_whitespace().map(|f| f.parse::<f64>().ok());
            match (fields.next()?, fields.next()?, fields.next()?) {
                (Some(one), Some(five), Some(fifteen)) => Some(LoadAverage { one, five, fifteen }),
                _ => None,
            }
        })
        .ok_or_else(|| ParseError::new(CommandId::LoadAverage, "expected three load figures", raw))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ETHTOOL: &str = "\
Settings for eth0:
\tSupported ports: [ TP MII ]
\tSpeed: 1000Mb/s
\tDuplex: Full
\tAuto-negotiation: on
\tLink detected: yes
";

    const MEMINFO: &str = "\
MemTotal:         246812 kB
MemFree:           83120 kB
MemAvailable:     121340 kB
Buffers:            5120 kB
Cached:            41920 kB
";

    #[test]
    fn parses_ethtool() {
        let info = parse_link_info(ETHTOOL).unwrap();
        assert_eq!(
            info,
            LinkInfo {
                speed_mbps: Some(1000),
                duplex: Some("Full".into()),
                link_detected: Some(true),
            }
        );
    }

    #[test]
    fn unknown_speed_is_valid() {
        let raw = "Settings for eth1:\n\tSpeed: Unknown!\n\tDuplex: Unknown! (255)\n\tLink detected: no\n";
        let info = parse_link_info(raw).unwrap();
        assert_eq!(info.speed_mbps, None);
        assert_eq!(info.duplex, None);
        assert_eq!(info.link_detected, Some(false));
    }

    #[test]
    fn missing_ethtool_is_empty_report() {
        assert_eq!(parse_link_info("").unwrap(), LinkInfo::default());
    }

    #[test]
    fn temperature_millidegrees_and_degrees() {
        assert_eq!(parse_cpu_temperature("52300\n").unwrap(), Some(52.3));
        assert_eq!(parse_cpu_temperature("48\n").unwrap(), Some(48.0));
    }

    #[test]
    fn temperature_absent_is_not_an_error() {
        assert_eq!(parse_cpu_temperature("unsupported\n").unwrap(), None);
        assert_eq!(parse_cpu_temperature("").unwrap(), None);
    }

    #[test]
    fn temperature_garbage_is_an_error() {
        let err = parse_cpu_temperature("cat: read error\n").unwrap_err();
        assert_eq!(err.command, CommandId::CpuTemperature);
    }

    #[test]
    fn memory_prefers_mem_available() {
        let mem = parse_memory(MEMINFO).unwrap();
        assert_eq!(mem.total_kb, 246_812);
        assert_eq!(mem.available_kb, 121_340);
    }

    #[test]
    fn memory_falls_back_on_old_kernels() {
        let raw = MEMINFO.replace("MemAvailable:     121340 kB\n", "");
        let mem = parse_memory(&raw).unwrap();
        assert_eq!(mem.available_kb, 83_120 + 5_120 + 41_920);
    }

    #[test]
    fn memory_without_total_is_an_error() {
        assert!(parse_memory("MemFree: 10 kB\n").is_err());
        assert!(parse_memory("").is_err());
    }

    #[test]
    fn parses_loadavg() {
        let load = parse_load_average("0.42 0.35 0.30 1/123 4567\n").unwrap();
        assert_eq!(
            load,
            LoadAverage {
                one: 0.42,
                five: 0.35,
                fifteen: 0.30,
            }
        );
    }

    #[test]
    fn loadavg_needs_three_numbers() {
        assert!(parse_load_average("0.42 0.35\n").is_err());
        assert!(parse_load_average("load high\n").is_err());
    }
}
