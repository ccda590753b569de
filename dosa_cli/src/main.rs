//! `dosa`: valve dosing controller CLI.
//!
//! Loads the typed config, sets up tracing and dispatches to the
//! `run`, `simulate` and `self-check` subcommands.

mod cli;
mod error_fmt;
mod run;
mod self_check;
mod session;
mod simulate;

use std::path::Path;

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{CONFIG_CONTEXT, exit_code_for_error, format_error_json, humanize};

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        let json = JSON_MODE.get().copied().unwrap_or(false);
        if json {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging);

    match cli.cmd {
        Commands::Run { max_ticks } => run::run(&cfg, cli.json, max_ticks),
        Commands::Simulate { scenario, until_ms } => {
            simulate::simulate(&cfg, cli.json, &scenario, until_ms)
        }
        Commands::SelfCheck => self_check::self_check(&cfg, cli.json),
    }
}

fn load_config(path: &Path) -> eyre::Result<dosa_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))
        .wrap_err(CONFIG_CONTEXT)?;
    let cfg: dosa_config::Config = toml::from_str(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))
        .wrap_err(CONFIG_CONTEXT)?;
    cfg.validate().wrap_err(CONFIG_CONTEXT)?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout carries only status events.
/// An optional JSON file sink follows `[logging]` in the config.
fn init_tracing(json: bool, level: &str, logging: &dosa_config::Logging) {
    let level = logging.level.as_deref().unwrap_or(level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let console = if json {
        console.json().boxed()
    } else {
        console.boxed()
    };

    let file_layer = logging.file.as_deref().map(|file| {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "dosa.log".into(), |n| n.to_string_lossy().into_owned());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
            .boxed()
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .with(filter)
        .try_init();
}
