//! `snapshot`: poll once, print everything, exit.

use std::fmt::Write;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tabled::Tabled;

use routerscope_core::{ClientDevice, MetricsSnapshot, QueryLogEntry, ServiceTag};

use crate::cli::{GlobalOpts, OutputFormat, SnapshotArgs};
use crate::error::CliError;
use crate::output;

use super::util::{fmt_bytes, fmt_celsius, fmt_mbps, fmt_ms, fmt_opt, fmt_pct};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Via")]
    connection: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Band")]
    band: String,
    #[tabled(rename = "Signal")]
    signal: String,
    #[tabled(rename = "Rate")]
    rate: String,
}

impl From<&ClientDevice> for ClientRow {
    fn from(c: &ClientDevice) -> Self {
        Self {
            name: c.display_name.clone(),
            ip: fmt_opt(c.ip),
            mac: c.mac.to_string(),
            connection: c.connection.to_string(),
            status: if c.online { "online" } else { "offline" },
            band: fmt_opt(c.band),
            signal: c
                .signal_dbm
                .map_or_else(|| "-".into(), |s| format!("{s} dBm")),
            rate: c
                .tx_bitrate_mbps
                .map_or_else(|| "-".into(), |r| format!("{r:.1} Mbps")),
        }
    }
}

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "#")]
    seq: u64,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Command")]
    command: String,
    #[tabled(rename = "Took")]
    took: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&QueryLogEntry> for LogRow {
    fn from(e: &QueryLogEntry) -> Self {
        Self {
            seq: e.seq,
            time: e.timestamp.format("%H:%M:%S").to_string(),
            command: e.command.to_string(),
            took: format!("{}ms", e.duration_ms),
            outcome: e.outcome.to_string(),
            detail: e.detail.clone().unwrap_or_default(),
        }
    }
}

/// Structured output for `snapshot --log`.
#[derive(Serialize)]
struct SnapshotReport<'a> {
    snapshot: &'a MetricsSnapshot,
    query_log: Vec<&'a QueryLogEntry>,
}

// ── Detail view ─────────────────────────────────────────────────────

fn detail(snap: &MetricsSnapshot, color: bool) -> String {
    let mut out = String::new();

    let mut title = format!(
        "Snapshot #{} at {}",
        snap.sequence,
        snap.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if snap.stale {
        let _ = write!(title, "  {}", output::stale_marker(color));
    }
    let _ = writeln!(out, "{}", output::heading(&title, color));
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", output::heading("WAN", color));
    let _ = writeln!(out, "  Interface:  {}", snap.wan_interface);
    match snap.throughput {
        Some(t) => {
            let _ = writeln!(out, "  Download:   {}", fmt_mbps(Some(t.download_mbps)));
            let _ = writeln!(out, "  Upload:     {}", fmt_mbps(Some(t.upload_mbps)));
            let _ = writeln!(out, "  Total:      {}", fmt_mbps(Some(t.total_mbps)));
        }
        None => {
            let _ = writeln!(out, "  Throughput: {}", output::dim("waiting for a second sample", color));
        }
    }
    if let Some(ref c) = snap.wan_counters {
        let _ = writeln!(
            out,
            "  Counters:   rx {}  tx {}",
            fmt_bytes(c.rx_bytes),
            fmt_bytes(c.tx_bytes)
        );
    }
    if let Some(ref c) = snap.lan_counters {
        let _ = writeln!(
            out,
            "  LAN ({}):  rx {}  tx {}",
            c.interface,
            fmt_bytes(c.rx_bytes),
            fmt_bytes(c.tx_bytes)
        );
    }
    if let Some(ref link) = snap.link {
        let speed = link
            .speed_mbps
            .map_or_else(|| "-".into(), |s| format!("{s} Mb/s"));
        let duplex = link.duplex.clone().unwrap_or_else(|| "-".into());
        let detected = match link.link_detected {
            Some(true) => "up",
            Some(false) => "down",
            None => "-",
        };
        let _ = writeln!(out, "  Link:       {speed}, {duplex} duplex, {detected}");
    }
    let _ = writeln!(out, "  Latency:    {}", fmt_ms(snap.latency_ms));
    let _ = writeln!(out);

    let health = &snap.health;
    let _ = writeln!(out, "{}", output::heading("System", color));
    let load = health.load_average.map_or_else(
        || "-".into(),
        |l| format!("{:.2} {:.2} {:.2}", l.one, l.five, l.fifteen),
    );
    let _ = writeln!(out, "  Load:       {load}");
    let memory = match health.memory {
        Some(m) => format!(
            "{} ({} of {} available)",
            fmt_pct(health.ram_usage_pct),
            fmt_bytes(m.available_kb.saturating_mul(1024)),
            fmt_bytes(m.total_kb.saturating_mul(1024))
        ),
        None => "-".into(),
    };
    let _ = writeln!(out, "  Memory:     {memory}");
    let _ = writeln!(out, "  CPU temp:   {}", fmt_celsius(health.cpu_temp_c));

    if let Some(summary) = snap.service_summary {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", output::heading("Connections", color));
        for tag in [ServiceTag::Https, ServiceTag::Ssh, ServiceTag::Speedtest, ServiceTag::Other] {
            let _ = writeln!(out, "  {:<11} {}", format!("{tag}:"), summary.get(tag));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} ({})",
        output::heading("Clients", color),
        snap.client_count()
    );
    match snap.clients {
        Some(ref clients) if !clients.is_empty() => {
            let rows: Vec<ClientRow> = clients.iter().map(ClientRow::from).collect();
            let _ = writeln!(out, "{}", output::render_table(&rows));
        }
        Some(_) => {
            let _ = writeln!(out, "  {}", output::dim("none", color));
        }
        None => {
            let _ = writeln!(out, "  {}", output::dim("unavailable", color));
        }
    }

    if !snap.omitted.is_empty() {
        let names: Vec<String> = snap.omitted.iter().map(ToString::to_string).collect();
        let _ = writeln!(
            out,
            "{}",
            output::dim(&format!("Omitted this cycle: {}", names.join(", ")), color)
        );
    }
    let _ = write!(
        out,
        "{}",
        output::dim(&format!("Collected in {}ms", snap.collection_ms), color)
    );

    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: SnapshotArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = super::resolve_config(global)?;
    let color = output::should_color(&global.color);

    let spinner = spinner(global, &format!("Polling {}...", cfg.device.host));
    let monitor = match super::start_monitor(&cfg).await {
        Ok(m) => m,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };
    let first = super::first_snapshot(&monitor).await;
    spinner.finish_and_clear();
    let log = monitor.query_log();
    monitor.shutdown().await;

    let snap: Arc<MetricsSnapshot> = first?;

    let rendered = if args.log {
        render_with_log(&global.output, &snap, &log, color)
    } else {
        output::render_single(
            &global.output,
            snap.as_ref(),
            |s| detail(s, color),
            |s| s.sequence.to_string(),
        )
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn render_with_log(
    format: &OutputFormat,
    snap: &MetricsSnapshot,
    log: &[Arc<QueryLogEntry>],
    color: bool,
) -> String {
    let entries = || {
        output::render_list(
            format,
            log,
            |e| LogRow::from(e.as_ref()),
            |e| format!("{} {} {}", e.seq, e.command, e.outcome),
        )
    };
    match format {
        OutputFormat::Table => format!(
            "{}\n\n{}\n{}",
            detail(snap, color),
            output::heading("Query log", color),
            entries()
        ),
        OutputFormat::Plain => entries(),
        _ => {
            let report = SnapshotReport {
                snapshot: snap,
                query_log: log.iter().map(AsRef::as_ref).collect(),
            };
            output::render_single(format, &report, |_| String::new(), |_| String::new())
        }
    }
}

fn spinner(global: &GlobalOpts, message: &str) -> ProgressBar {
    if global.quiet || !matches!(global.output, OutputFormat::Table) {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}
