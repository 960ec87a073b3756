//! Configuration for the routerscope CLI.
//!
//! Layered loading (defaults, TOML file, `ROUTERSCOPE_*` environment,
//! command-line overrides) and translation into the core's
//! [`MonitorConfig`] and the transport's [`SshConfig`]. Validation runs
//! once, here; anything invalid is a startup failure.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use routerscope_api::SshConfig;
use routerscope_core::{CoreError, MonitorConfig};

pub const ENV_PREFIX: &str = "ROUTERSCOPE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{0}")]
    Monitor(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<CoreError> for ConfigError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => Self::Monitor(message),
            other => Self::Monitor(other.to_string()),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub device: Device,

    /// Interface whose counters drive throughput.
    pub wan_interface: String,
    pub lan_interface: String,

    pub poll_interval_secs: u64,
    pub command_timeout_secs: u64,

    /// Prior snapshots kept for trend display.
    pub history_size: usize,
    /// Query-log ring capacity.
    pub log_capacity: usize,

    pub backoff_base_secs: u64,
    pub backoff_max_secs: u64,

    /// Latency probe target. Empty disables the probe.
    pub ping_target: String,

    /// Destination ports eligible for the speedtest tag.
    pub speedtest_ports: Vec<u16>,
    pub speedtest_min_bytes: u64,
}

/// How to reach the router.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Device {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Private key passed to `ssh -i`. Agent and default keys otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,
    pub connect_timeout_secs: u64,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            host: MonitorConfig::default().host,
            port: 22,
            user: "root".into(),
            identity_file: None,
            connect_timeout_secs: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let monitor = MonitorConfig::default();
        Self {
            device: Device::default(),
            wan_interface: monitor.wan_interface,
            lan_interface: monitor.lan_interface,
            poll_interval_secs: monitor.poll_interval.as_secs(),
            command_timeout_secs: monitor.command_timeout.as_secs(),
            history_size: monitor.history_size,
            log_capacity: monitor.log_capacity,
            backoff_base_secs: monitor.backoff_base.as_secs(),
            backoff_max_secs: monitor.backoff_max.as_secs(),
            ping_target: monitor.ping_target.unwrap_or_default(),
            speedtest_ports: monitor.speedtest_ports,
            speedtest_min_bytes: monitor.speedtest_min_bytes,
        }
    }
}

/// Values given on the command line. They win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub identity_file: Option<PathBuf>,
    pub wan_interface: Option<String>,
    pub poll_interval_secs: Option<u64>,
}

impl Config {
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.device.host = host;
        }
        if let Some(port) = overrides.port {
            self.device.port = port;
        }
        if let Some(user) = overrides.user {
            self.device.user = user;
        }
        if let Some(path) = overrides.identity_file {
            self.device.identity_file = Some(path);
        }
        if let Some(wan) = overrides.wan_interface {
            self.wan_interface = wan;
        }
        if let Some(secs) = overrides.poll_interval_secs {
            self.poll_interval_secs = secs;
        }
    }

    /// Build and validate the monitor settings.
    pub fn to_monitor_config(&self) -> Result<MonitorConfig, ConfigError> {
        let ping_target = self.ping_target.trim();
        let monitor = MonitorConfig {
            host: self.device.host.clone(),
            wan_interface: self.wan_interface.clone(),
            lan_interface: self.lan_interface.clone(),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            command_timeout: Duration::from_secs(self.command_timeout_secs),
            history_size: self.history_size,
            log_capacity: self.log_capacity,
            backoff_base: Duration::from_secs(self.backoff_base_secs),
            backoff_max: Duration::from_secs(self.backoff_max_secs),
            ping_target: (!ping_target.is_empty()).then(|| ping_target.to_owned()),
            speedtest_ports: self.speedtest_ports.clone(),
            speedtest_min_bytes: self.speedtest_min_bytes,
        };
        monitor.validate()?;
        Ok(monitor)
    }

    /// Build the SSH transport settings. `control_dir` holds the
    /// multiplexing socket.
    pub fn to_ssh_config(&self, control_dir: &Path) -> Result<SshConfig, ConfigError> {
        let device = &self.device;
        if device.port == 0 {
            return Err(ConfigError::Validation {
                field: "device.port".into(),
                reason: "must be between 1 and 65535".into(),
            });
        }
        if device.user.is_empty() || device.user.chars().any(|c| !is_user_char(c)) {
            return Err(ConfigError::Validation {
                field: "device.user".into(),
                reason: format!("'{}' is not a valid login name", device.user),
            });
        }
        if device.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "device.connect_timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }

        let mut ssh = SshConfig::new(device.host.clone());
        ssh.port = device.port;
        ssh.user.clone_from(&device.user);
        ssh.identity_file.clone_from(&device.identity_file);
        ssh.connect_timeout = Duration::from_secs(device.connect_timeout_secs);
        ssh.control_dir = control_dir.to_path_buf();
        Ok(ssh)
    }
}

fn is_user_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "routerscope").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the SSH multiplexing socket lives: the per-user runtime dir when
/// the platform has one, the temp dir otherwise.
pub fn control_dir() -> PathBuf {
    ProjectDirs::from("", "", "routerscope")
        .and_then(|dirs| dirs.runtime_dir().map(Path::to_path_buf))
        .unwrap_or_else(std::env::temp_dir)
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("routerscope");
    p
}

// ── Config loading ──────────────────────────────────────────────────

fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load from `path` (or the default location) plus environment. A missing
/// file is not an error: defaults apply.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment(&path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parent
/// directories.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.device, Device::default());
        assert_eq!(config.wan_interface, "eth0");
        assert_eq!(config.poll_interval_secs, 3);
        assert_eq!(config.speedtest_ports, vec![8080, 5060]);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
wan_interface = "wan"
poll_interval_secs = 5
ping_target = ""

[device]
host = "10.0.0.1"
user = "admin"
"#,
        );
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.device.host, "10.0.0.1");
        assert_eq!(config.device.user, "admin");
        assert_eq!(config.device.port, 22, "unset keys keep defaults");

        let monitor = config.to_monitor_config().unwrap();
        assert_eq!(monitor.wan_interface, "wan");
        assert_eq!(monitor.poll_interval, Duration::from_secs(5));
        assert_eq!(monitor.ping_target, None);
        assert_eq!(monitor.lan_interface, "br-lan");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "poll_interval_secs = \"soon\"\n");
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Figment(_))));
    }

    #[test]
    fn overrides_beat_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "[device]\nhost = \"10.0.0.1\"\n");
        let mut config = load_config(Some(&path)).unwrap();
        config.apply(Overrides {
            host: Some("192.168.8.1".into()),
            wan_interface: Some("eth1".into()),
            ..Overrides::default()
        });
        assert_eq!(config.device.host, "192.168.8.1");
        assert_eq!(config.wan_interface, "eth1");
    }

    #[test]
    fn invalid_interface_is_rejected() {
        let config = Config {
            wan_interface: "eth0 && reboot".into(),
            ..Config::default()
        };
        let err = config.to_monitor_config().unwrap_err();
        assert!(matches!(err, ConfigError::Monitor(ref m) if m.contains("wan_interface")), "{err}");
    }

    #[test]
    fn ssh_settings_follow_device_section() {
        let mut config = Config::default();
        config.device.port = 2222;
        config.device.identity_file = Some(PathBuf::from("/keys/router"));
        let ssh = config.to_ssh_config(Path::new("/run/rs")).unwrap();
        assert_eq!(ssh.port, 2222);
        assert_eq!(ssh.user, "root");
        assert_eq!(ssh.identity_file, Some(PathBuf::from("/keys/router")));
        assert_eq!(ssh.connect_timeout, Duration::from_secs(5));
        assert_eq!(ssh.control_dir, PathBuf::from("/run/rs"));
    }

    #[test]
    fn bad_ssh_user_is_rejected() {
        let mut config = Config::default();
        config.device.user = "root; rm".into();
        let err = config.to_ssh_config(Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "device.user"));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.device.host = "router.lan".into();
        config.history_size = 10;
        save_config(&config, &path).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), config);
    }
}
