//! Control actions: `flush-leases` and `reboot`.

use routerscope_core::{CommandResult, Monitor};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn flush_leases(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = super::resolve_config(global)?;
    let prompt = format!(
        "Delete every DHCP lease on {} and restart dnsmasq?",
        cfg.device.host
    );
    if !util::confirm(&prompt, "flush-leases", global.yes)? {
        return Ok(());
    }

    let monitor = super::start_monitor(&cfg).await?;
    let result = run(&monitor, Monitor::flush_leases).await?;
    report(global, &result, &format!("DHCP leases flushed on {}", cfg.device.host));
    Ok(())
}

pub async fn reboot(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = super::resolve_config(global)?;
    let prompt = format!("Reboot {} now?", cfg.device.host);
    if !util::confirm(&prompt, "reboot", global.yes)? {
        return Ok(());
    }

    let monitor = super::start_monitor(&cfg).await?;
    let result = run(&monitor, Monitor::reboot).await?;
    report(
        global,
        &result,
        &format!("{} is rebooting; it will be unreachable for a minute or two", cfg.device.host),
    );
    Ok(())
}

/// Issue one control action and release the session whatever happened.
async fn run<'a, F, Fut>(monitor: &'a Monitor, action: F) -> Result<CommandResult, CliError>
where
    F: FnOnce(&'a Monitor) -> Fut,
    Fut: std::future::Future<Output = Result<CommandResult, routerscope_core::CoreError>>,
{
    let result = action(monitor).await;
    monitor.shutdown().await;
    Ok(result?)
}

fn report(global: &GlobalOpts, result: &CommandResult, message: &str) {
    let color = output::should_color(&global.color);
    let rendered = match global.output {
        OutputFormat::Table => format!(
            "{message} {}",
            output::dim(&format!("({}ms)", result.duration.as_millis()), color)
        ),
        _ => output::render_single(
            &global.output,
            result,
            |_| String::new(),
            |r| r.command.to_string(),
        ),
    };
    output::print_output(&rendered, global.quiet);
}
