// ── Remote command catalog ──
//
// The literal shell commands the parsers depend on. Built once from the
// validated config and never changed afterwards. Interface names and the
// ping target are interpolated, so they must pass `MonitorConfig::validate`
// first.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::config::MonitorConfig;

/// Identifier of every command the monitor may issue.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommandId {
    // ── Polled ──
    InterfaceCounters,
    LinkInfo,
    StationDump,
    DhcpLeases,
    ArpTable,
    CpuTemperature,
    Memory,
    LoadAverage,
    Conntrack,
    Ping,
    // ── Control ──
    FlushLeases,
    Reboot,
}

impl CommandId {
    /// Control actions mutate the device and are never parsed.
    pub fn is_control(self) -> bool {
        matches!(self, Self::FlushLeases | Self::Reboot)
    }
}

/// What the executor does when the channel drops mid-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Re-establish the channel once and run the command again.
    ReconnectOnce,
    /// Surface the failure immediately. Used for commands that must not
    /// run twice.
    NoRetry,
}

/// One immutable entry of the command set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub id: CommandId,
    pub text: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// A transport failure on a required command fails the whole cycle.
    pub required: bool,
}

const STATION_DUMP: &str = "for dev in $(iw dev 2>/dev/null | awk '/Interface/ {print $2}'); \
     do iw dev $dev info; iw dev $dev station dump; done";

const CPU_TEMPERATURE: &str = "cat /sys/class/thermal/thermal_zone0/temp 2>/dev/null \
     || cat /sys/devices/virtual/thermal/thermal_zone0/temp 2>/dev/null \
     || cat /sys/class/hwmon/hwmon0/temp1_input 2>/dev/null \
     || echo unsupported";

const CONNTRACK: &str =
    "cat /proc/net/nf_conntrack 2>/dev/null || cat /proc/net/ip_conntrack 2>/dev/null; true";

/// The full command set for one device.
#[derive(Debug, Clone)]
pub struct CommandSet {
    commands: Vec<RemoteCommand>,
}

impl CommandSet {
    pub fn from_config(config: &MonitorConfig) -> Self {
        let timeout = config.command_timeout;
        let polled = |id, text: String, required| RemoteCommand {
            id,
            text,
            timeout,
            retry: RetryPolicy::ReconnectOnce,
            required,
        };

        let mut commands = vec![
            polled(CommandId::InterfaceCounters, "cat /proc/net/dev".into(), true),
            polled(
                CommandId::LinkInfo,
                format!("ethtool {} 2>/dev/null", config.wan_interface),
                false,
            ),
            polled(CommandId::StationDump, STATION_DUMP.into(), true),
            polled(
                CommandId::DhcpLeases,
                "cat /tmp/dhcp.leases 2>/dev/null; true".into(),
                true,
            ),
            polled(CommandId::ArpTable, "cat /proc/net/arp".into(), false),
            polled(CommandId::CpuTemperature, CPU_TEMPERATURE.into(), false),
            polled(CommandId::Memory, "cat /proc/meminfo".into(), true),
            polled(CommandId::LoadAverage, "cat /proc/loadavg".into(), true),
            polled(CommandId::Conntrack, CONNTRACK.into(), false),
        ];

        if let Some(ref target) = config.ping_target {
            commands.push(polled(
                CommandId::Ping,
                format!("ping -c 1 -W 2 {target} 2>&1; true"),
                false,
            ));
        }

        commands.push(RemoteCommand {
            id: CommandId::FlushLeases,
            text: "rm -f /tmp/dhcp.leases && /etc/init.d/dnsmasq restart".into(),
            timeout,
            retry: RetryPolicy::ReconnectOnce,
            required: false,
        });
        commands.push(RemoteCommand {
            id: CommandId::Reboot,
            text: "reboot".into(),
            timeout,
            retry: RetryPolicy::NoRetry,
            required: false,
        });

        Self { commands }
    }

    pub fn get(&self, id: CommandId) -> Option<&RemoteCommand> {
        self.commands.iter().find(|c| c.id == id)
    }

    /// Commands issued by each poll cycle, in execution order.
    pub fn polled(&self) -> impl Iterator<Item = &RemoteCommand> {
        self.commands.iter().filter(|c| !c.id.is_control())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteCommand> {
        self.commands.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wan_interface_is_interpolated() {
        let config = MonitorConfig {
            wan_interface: "wan".into(),
            ..MonitorConfig::default()
        };
        let set = CommandSet::from_config(&config);
        assert_eq!(
            set.get(CommandId::LinkInfo).unwrap().text,
            "ethtool wan 2>/dev/null"
        );
    }

    #[test]
    fn empty_ping_target_disables_ping() {
        let config = MonitorConfig {
            ping_target: None,
            ..MonitorConfig::default()
        };
        let set = CommandSet::from_config(&config);
        assert!(set.get(CommandId::Ping).is_none());
        assert!(set.polled().all(|c| c.id != CommandId::Ping));
    }

    #[test]
    fn reboot_is_never_retried() {
        let set = CommandSet::from_config(&MonitorConfig::default());
        assert_eq!(set.get(CommandId::Reboot).unwrap().retry, RetryPolicy::NoRetry);
        assert_eq!(
            set.get(CommandId::FlushLeases).unwrap().retry,
            RetryPolicy::ReconnectOnce
        );
    }

    #[test]
    fn required_set_matches_contract() {
        let set = CommandSet::from_config(&MonitorConfig::default());
        let required: Vec<CommandId> = set.polled().filter(|c| c.required).map(|c| c.id).collect();
        assert_eq!(
            required,
            vec![
                CommandId::InterfaceCounters,
                CommandId::StationDump,
                CommandId::DhcpLeases,
                CommandId::Memory,
                CommandId::LoadAverage,
            ]
        );
        assert!(set.polled().all(|c| !c.id.is_control()));
    }

    #[test]
    fn command_ids_round_trip_through_strings() {
        assert_eq!(CommandId::StationDump.to_string(), "station_dump");
        assert_eq!("flush_leases".parse::<CommandId>().unwrap(), CommandId::FlushLeases);
    }
}
