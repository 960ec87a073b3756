//! Clap derive structures for the `routerscope` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use routerscope_config::Overrides;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// routerscope -- live telemetry for an OpenWrt router over SSH
#[derive(Debug, Parser)]
#[command(
    name = "routerscope",
    version,
    about = "Watch router throughput, clients and health over SSH",
    long_about = "Polls an OpenWrt-style router over a single multiplexed SSH session.\n\n\
        Reports WAN throughput, connected clients (DHCP leases joined with the\n\
        wireless station dump), CPU/memory/temperature and tagged connections.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (default: platform config dir)
    #[arg(long, env = "ROUTERSCOPE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Router address (overrides config)
    #[arg(long, short = 'H', global = true)]
    pub host: Option<String>,

    /// SSH port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// SSH login user
    #[arg(long, short = 'u', global = true)]
    pub user: Option<String>,

    /// SSH private key
    #[arg(long, short = 'i', global = true)]
    pub identity: Option<PathBuf>,

    /// WAN interface name
    #[arg(long, global = true)]
    pub wan: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ROUTERSCOPE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

impl GlobalOpts {
    /// Command-line values that override file and environment config.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            identity_file: self.identity.clone(),
            wan_interface: self.wan.clone(),
            poll_interval_secs: None,
        }
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll continuously and print every snapshot
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Take one snapshot and exit
    #[command(alias = "snap")]
    Snapshot(SnapshotArgs),

    /// Delete all DHCP leases and restart the DHCP server
    FlushLeases,

    /// Soft-reboot the router
    Reboot,

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH / SNAPSHOT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in seconds (overrides config)
    #[arg(long, short = 'n')]
    pub interval: Option<u64>,

    /// Stop after this many snapshots
    #[arg(long, short = 'c')]
    pub count: Option<u64>,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Also print the command query log
    #[arg(long)]
    pub log: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration (file + env + flags)
    Show,

    /// Print the config file location
    Path,

    /// Create a config file with guided setup
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
