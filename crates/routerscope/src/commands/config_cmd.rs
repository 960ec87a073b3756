//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::Input;

use routerscope_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

fn prompt(label: &str, default: &str) -> Result<String, CliError> {
    Input::new()
        .with_prompt(label)
        .default(default.to_owned())
        .interact_text()
        .map_err(prompt_err)
}

/// Ask for the handful of values that differ between routers.
fn prompt_device(cfg: &mut Config) -> Result<(), CliError> {
    cfg.device.host = prompt("Router address", &cfg.device.host)?;
    cfg.device.user = prompt("SSH user", &cfg.device.user)?;
    cfg.wan_interface = prompt("WAN interface", &cfg.wan_interface)?;
    cfg.lan_interface = prompt("LAN interface", &cfg.lan_interface)?;
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = super::resolve_config(global)?;
            let rendered = match global.output {
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)
                    .map_err(|e| CliError::Internal(e.to_string()))?,
                _ => output::render_single(&global.output, &cfg, |_| String::new(), |_| String::new()),
            };
            output::print_output(rendered.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            let path = global.config.clone().unwrap_or_else(config::config_path);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = global.config.clone().unwrap_or_else(config::config_path);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let mut cfg = Config::default();
            cfg.apply(global.overrides());

            let interactive = !global.yes && std::io::stdin().is_terminal();
            if interactive {
                eprintln!("routerscope configuration");
                eprintln!("   Config path: {}\n", path.display());
                prompt_device(&mut cfg)?;
            }

            // Catch typos now rather than on the first poll.
            cfg.to_monitor_config()?;

            config::save_config(&cfg, &path)?;
            if !global.quiet {
                eprintln!("Wrote {}", path.display());
            }
            Ok(())
        }
    }
}
