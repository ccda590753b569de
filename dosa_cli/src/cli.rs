//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "dosa", version, about = "Valve dosing controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/dosa_config.toml")]
    pub config: PathBuf,

    /// Print status events and logs as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop in real time; commands are read from stdin as
    /// `<topic> <payload>` lines
    Run {
        /// Stop after this many ticks (runs until Ctrl-C otherwise)
        #[arg(long, value_name = "N")]
        max_ticks: Option<u64>,
    },
    /// Replay a scenario CSV (at_ms,topic,payload) against a simulated clock
    Simulate {
        /// Scenario CSV file (strict header)
        #[arg(long, value_name = "FILE")]
        scenario: PathBuf,
        /// Keep ticking until this simulated time (defaults to the last row)
        #[arg(long, value_name = "MS")]
        until_ms: Option<u64>,
    },
    /// Quick health check (pin map, backend, e-stop reading)
    SelfCheck,
}
