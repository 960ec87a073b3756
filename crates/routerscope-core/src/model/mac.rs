// ── MAC address ──
//
// The join key for client identity. Every source (leases, station dump,
// ARP) goes through the same normalization so joins are case-insensitive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from any common format.
    /// Accepts colon-separated or dash-separated input; no validation.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw.as_ref().trim().to_lowercase().replace('-', ":");
        Self(normalized)
    }

    /// Strict variant of [`new`](Self::new): the input must be six
    /// two-digit hex octets. Used by the parsers to reject garbage tokens.
    pub fn parse(raw: &str) -> Option<Self> {
        let mac = Self::new(raw);
        let octets: Vec<&str> = mac.0.split(':').collect();
        let valid = octets.len() == 6
            && octets
                .iter()
                .all(|o| o.len() == 2 && o.bytes().all(|b| b.is_ascii_hexdigit()));
        valid.then_some(mac)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `00:00:00:00:00:00`, which the kernel reports for unresolved neighbours.
    pub fn is_zero(&self) -> bool {
        self.0.bytes().all(|b| b == b'0' || b == b':')
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn mac_address_normalizes_dashes_and_case() {
        let mac = MacAddress::new("AA-BB-CC-DD-EE-FF");
        assert_eq!(mac.as_str(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn strict_parse_rejects_garbage() {
        assert!(MacAddress::parse("aa:bb:cc:dd:ee").is_none());
        assert!(MacAddress::parse("aa:bb:cc:dd:ee:gg").is_none());
        assert!(MacAddress::parse("192.168.1.1").is_none());
        assert!(MacAddress::parse("").is_none());
    }

    #[test]
    fn strict_parse_accepts_mixed_case() {
        let mac = MacAddress::parse("Aa:bB:0c:DD:ee:01").unwrap();
        assert_eq!(mac.to_string(), "aa:bb:0c:dd:ee:01");
    }

    #[test]
    fn zero_mac_is_detected() {
        assert!(MacAddress::new("00:00:00:00:00:00").is_zero());
        assert!(!MacAddress::new("00:00:00:00:00:01").is_zero());
    }
}
