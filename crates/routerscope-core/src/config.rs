// ── Runtime monitor configuration ──
//
// Describes *what* to collect and how often. SSH connection details live
// with the transport; the CLI builds both and hands them in. Core never
// reads config files.

use std::time::Duration;

use crate::error::CoreError;

/// Linux `IFNAMSIZ` minus the trailing NUL.
const MAX_INTERFACE_LEN: usize = 15;

/// Configuration for monitoring a single device.
///
/// Validated once by [`Monitor::start`](crate::Monitor::start); an invalid
/// value is fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Device address, used for diagnostics and validated for shell safety.
    pub host: String,
    /// Interface whose counters drive throughput.
    pub wan_interface: String,
    pub lan_interface: String,
    pub poll_interval: Duration,
    /// Per-command timeout.
    pub command_timeout: Duration,
    /// Number of prior snapshots kept for trend display.
    pub history_size: usize,
    /// Maximum query-log entries before the oldest are evicted.
    pub log_capacity: usize,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Latency probe target; `None` disables the probe.
    pub ping_target: Option<String>,
    pub speedtest_ports: Vec<u16>,
    pub speedtest_min_bytes: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.1".into(),
            wan_interface: "eth0".into(),
            lan_interface: "br-lan".into(),
            poll_interval: Duration::from_secs(3),
            command_timeout: Duration::from_secs(10),
            history_size: 60,
            log_capacity: 50,
            backoff_base: Duration::from_secs(2),
            backoff_max: Duration::from_secs(60),
            ping_target: Some("8.8.8.8".into()),
            speedtest_ports: vec![8080, 5060],
            speedtest_min_bytes: 10 * 1024 * 1024,
        }
    }
}

impl MonitorConfig {
    /// Check every field. Returns the first violation as
    /// [`CoreError::Config`].
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_host("device host", &self.host)?;
        validate_interface("wan_interface", &self.wan_interface)?;
        validate_interface("lan_interface", &self.lan_interface)?;
        if let Some(ref target) = self.ping_target {
            validate_host("ping_target", target)?;
        }

        if self.poll_interval < Duration::from_secs(1) {
            return Err(CoreError::config("poll interval must be at least 1s"));
        }
        if self.command_timeout < Duration::from_secs(1) {
            return Err(CoreError::config("command timeout must be at least 1s"));
        }
        if self.history_size == 0 {
            return Err(CoreError::config("history size must be at least 1"));
        }
        if self.log_capacity == 0 {
            return Err(CoreError::config("log capacity must be at least 1"));
        }
        if self.backoff_base.is_zero() {
            return Err(CoreError::config("backoff base must be greater than zero"));
        }
        if self.backoff_base > self.backoff_max {
            return Err(CoreError::config(format!(
                "backoff base ({}s) exceeds backoff max ({}s)",
                self.backoff_base.as_secs_f64(),
                self.backoff_max.as_secs_f64()
            )));
        }
        Ok(())
    }
}

fn validate_host(field: &str, host: &str) -> Result<(), CoreError> {
    if host.is_empty() {
        return Err(CoreError::config(format!("{field} is not set")));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '[' | ']');
    if let Some(bad) = host.chars().find(|c| !allowed(*c)) {
        return Err(CoreError::config(format!(
            "{field} `{host}` contains invalid character {bad:?}"
        )));
    }
    Ok(())
}

fn validate_interface(field: &str, name: &str) -> Result<(), CoreError> {
    if name.is_empty() || name.len() > MAX_INTERFACE_LEN {
        return Err(CoreError::config(format!(
            "{field} `{name}` must be 1-{MAX_INTERFACE_LEN} characters"
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | '-');
    if let Some(bad) = name.chars().find(|c| !allowed(*c)) {
        return Err(CoreError::config(format!(
            "{field} `{name}` contains invalid character {bad:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message(err: CoreError) -> String {
        match err {
            CoreError::Config { message } => message,
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        MonitorConfig::default().validate().unwrap();
    }

    #[test]
    fn host_with_shell_metacharacters_is_rejected() {
        let config = MonitorConfig {
            host: "10.0.0.1;reboot".into(),
            ..MonitorConfig::default()
        };
        assert!(message(config.validate().unwrap_err()).contains("';'"));
    }

    #[test]
    fn empty_host_is_rejected() {
        let config = MonitorConfig {
            host: String::new(),
            ..MonitorConfig::default()
        };
        assert_eq!(message(config.validate().unwrap_err()), "device host is not set");
    }

    #[test]
    fn interface_names_are_checked() {
        for bad in ["", "eth0 && reboot", "averyveryverylongname0", "eth$(id)"] {
            let config = MonitorConfig {
                wan_interface: bad.into(),
                ..MonitorConfig::default()
            };
            assert!(config.validate().is_err(), "accepted {bad:?}");
        }
        for good in ["eth0.2", "wan", "pppoe-wan", "lan1@eth0"] {
            let config = MonitorConfig {
                wan_interface: good.into(),
                ..MonitorConfig::default()
            };
            assert!(config.validate().is_ok(), "rejected {good:?}");
        }
    }

    #[test]
    fn sub_second_interval_is_rejected() {
        let config = MonitorConfig {
            poll_interval: Duration::from_millis(500),
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_capacities_are_rejected() {
        let history = MonitorConfig {
            history_size: 0,
            ..MonitorConfig::default()
        };
        let log = MonitorConfig {
            log_capacity: 0,
            ..MonitorConfig::default()
        };
        assert!(history.validate().is_err());
        assert!(log.validate().is_err());
    }

    #[test]
    fn backoff_base_above_max_is_rejected() {
        let config = MonitorConfig {
            backoff_base: Duration::from_secs(90),
            ..MonitorConfig::default()
        };
        assert!(message(config.validate().unwrap_err()).contains("exceeds"));
    }
}
