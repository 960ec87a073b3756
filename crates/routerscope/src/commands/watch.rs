//! `watch`: one line per published snapshot until Ctrl-C.

use owo_colors::OwoColorize;

use routerscope_core::{MetricsSnapshot, SchedulerState};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util::{fmt_celsius, fmt_ms, fmt_pct};

/// Render one snapshot as a single status line.
fn status_line(snap: &MetricsSnapshot, color: bool) -> String {
    let time = snap.timestamp.format("%H:%M:%S");
    let (down, up) = snap.throughput.map_or_else(
        || ("-".to_owned(), "-".to_owned()),
        |t| (format!("{:.2}", t.download_mbps), format!("{:.2}", t.upload_mbps)),
    );
    let arrows = if color {
        format!("{} {down}  {} {up} Mbps", "↓".green(), "↑".blue())
    } else {
        format!("↓ {down}  ↑ {up} Mbps")
    };
    let clients = snap
        .clients
        .as_ref()
        .map_or_else(|| "-".into(), |c| c.len().to_string());
    let cpu = snap
        .health
        .cpu_load
        .map_or_else(|| "-".into(), |l| format!("{l:.2}"));

    let mut line = format!(
        "{}  {arrows}  clients {clients}  load {cpu}  ram {}  temp {}  ping {}",
        output::dim(&time.to_string(), color),
        fmt_pct(snap.health.ram_usage_pct),
        fmt_celsius(snap.health.cpu_temp_c),
        fmt_ms(snap.latency_ms),
    );
    if snap.stale {
        line.push_str("  ");
        line.push_str(&output::stale_marker(color));
    }
    line
}

fn render(format: &OutputFormat, snap: &MetricsSnapshot, color: bool) -> String {
    match format {
        OutputFormat::Table => status_line(snap, color),
        // Structured output is one document per line so it can be piped.
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_single(
            &OutputFormat::JsonCompact,
            snap,
            |_| String::new(),
            |_| String::new(),
        ),
        OutputFormat::Yaml => format!(
            "---\n{}",
            output::render_single(format, snap, |_| String::new(), |_| String::new())
        ),
        OutputFormat::Plain => format!(
            "{} {} {}",
            snap.sequence,
            snap.throughput.map_or(0.0, |t| t.download_mbps),
            snap.throughput.map_or(0.0, |t| t.upload_mbps)
        ),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = super::resolve_config(global)?;
    if let Some(secs) = args.interval {
        cfg.poll_interval_secs = secs;
    }
    let color = output::should_color(&global.color);

    let monitor = super::start_monitor(&cfg).await?;
    if matches!(global.output, OutputFormat::Table) && !global.quiet {
        eprintln!(
            "Watching {} every {} (Ctrl-C to stop)",
            cfg.device.host,
            humantime::format_duration(monitor.config().poll_interval)
        );
    }

    let mut stream = monitor.subscribe();
    let mut state = monitor.state();
    let mut printed: u64 = 0;
    let mut last_state = *state.borrow();

    let result = loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break Ok(()),
            snap = stream.changed() => {
                let Some(snap) = snap else {
                    break Err(CliError::Disconnected);
                };
                output::print_output(&render(&global.output, &snap, color), global.quiet);
                printed += 1;
                if args.count.is_some_and(|n| printed >= n) {
                    break Ok(());
                }
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break Err(CliError::Disconnected);
                }
                let current = *state.borrow_and_update();
                let entered_backoff = matches!(current, SchedulerState::Backoff { .. })
                    && current != last_state;
                if entered_backoff && !global.quiet {
                    eprintln!("{}", output::dim(&format!("router unreachable: {current}"), color));
                }
                last_state = current;
            }
        }
    };

    monitor.shutdown().await;
    result
}
