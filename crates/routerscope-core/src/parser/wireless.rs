// `iw dev <if> info` followed by `iw dev <if> station dump`, for every
// wireless interface.
//
// The info block gives the radio's channel frequency, hence the band; the
// station blocks give MAC, signal and tx bitrate. Station blocks name
// their interface (`Station <mac> (on wlan0)`), so the band is looked up
// by interface rather than by position.

use std::collections::HashMap;

use crate::command::CommandId;
use crate::error::ParseError;
use crate::model::{Band, MacAddress, WirelessStationRecord};

use super::finish_list;

pub fn parse_station_dump(raw: &str) -> Result<Vec<WirelessStationRecord>, ParseError> {
    let mut bands: HashMap<String, Band> = HashMap::new();
    let mut current_if: Option<String> = None;
    let mut stations: Vec<WirelessStationRecord> = Vec::new();
    let mut open: Option<WirelessStationRecord> = None;
    let mut recognized = 0;

    for line in raw.lines() {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("Interface ") {
            stations.extend(open.take());
            recognized += 1;
            current_if = Some(rest.trim().to_owned());
        } else if let Some(rest) = trimmed.strip_prefix("channel ") {
            // channel 36 (5180 MHz), width: 80 MHz, center1: 5210 MHz
            if let (Some(iface), Some(freq)) = (current_if.as_ref(), channel_frequency(rest)) {
                recognized += 1;
                if let Some(band) = Band::from_frequency_mhz(freq) {
                    bands.insert(iface.clone(), band);
                }
            }
        } else if let Some(rest) = trimmed.strip_prefix("Station ") {
            stations.extend(open.take());
            open = parse_station_header(rest, current_if.as_deref());
            if open.is_some() {
                recognized += 1;
            }
        } else if let Some(station) = open.as_mut() {
            if let Some(rest) = trimmed.strip_prefix("signal:") {
                station.signal_dbm = rest
                    .split_whitespace()
                    .next()
                    .and_then(|v| v.parse::<i32>().ok());
            } else if let Some(rest) = trimmed.strip_prefix("tx bitrate:") {
                station.tx_bitrate_mbps = rest
                    .split_whitespace()
                    .next()
                    .and_then(|v| v.parse::<f64>().ok())
                    .filter(|v| v.is_finite());
            }
        }
    }
    stations.extend(open.take());

    for station in &mut stations {
        station.band = bands.get(&station.interface).copied();
    }

    finish_list(CommandId::StationDump, raw, stations, recognized)
}

/// `aa:bb:cc:dd:ee:ff (on wlan0)`
fn parse_station_header(rest: &str, current_if: Option<&str>) -> Option<WirelessStationRecord> {
    let mut parts = rest.split_whitespace();
    let mac = MacAddress::parse(parts.next()?)?;
    let interface = match (parts.next(), parts.next()) {
        (Some("(on"), Some(dev)) => dev.trim_end_matches(')').to_owned(),
        _ => current_if?.to_owned(),
    };
    Some(WirelessStationRecord {
        mac,
        interface,
        band: None,
        signal_dbm: None,
        tx_bitrate_mbps: None,
    })
}

/// `36 (5180 MHz), width: ...` → 5180
fn channel_frequency(rest: &str) -> Option<u32> {
    let (_, after) = rest.split_once('(')?;
    let (freq, _) = after.split_once("MHz")?;
    freq.trim().parse().ok()
}
