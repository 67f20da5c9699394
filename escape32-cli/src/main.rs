//! escape32-update - Command-line tool for updating ESCape32 motor controllers.
//!
//! ## Features
//!
//! - Print bootloader and firmware info of a connected ESC
//! - Update the firmware or the bootloader from a raw binary image
//! - Forced mode tolerating unexpected device replies
//! - Environment variable and configuration file support

use anyhow::Result;
use clap::Parser;
use console::style;
use env_logger::Env;
use escape32::{DEFAULT_DEVICE, RunConfig, Target};
use log::debug;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

mod commands;
mod config;

use config::Config;

/// Whether stderr is a terminal (set once at startup).
static STDERR_IS_TTY: AtomicBool = AtomicBool::new(true);

/// Check if emoji/animations should be used (TTY and colors enabled).
fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(Ordering::Relaxed) && console::colors_enabled_stderr()
}

/// escape32-update - Query and update ESCape32 motor controllers.
///
/// Environment variables:
///   ESCAPE32_DEVICE   - Default serial device
///   ESCAPE32_BAUD     - Default baud rate (default: 38400)
#[derive(Parser, Debug)]
#[command(name = "escape32-update")]
#[command(version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Binary image filename for update (ESC info is printed if omitted).
    #[arg(value_name = "IMAGE")]
    image: Option<PathBuf>,

    /// Serial device name.
    #[arg(short, long, env = "ESCAPE32_DEVICE")]
    device: Option<String>,

    /// Ignore errors (forced update).
    #[arg(short, long)]
    force: bool,

    /// Update bootloader.
    #[arg(short = 'B', long)]
    bootloader: bool,

    /// Baud rate.
    #[arg(long, env = "ESCAPE32_BAUD")]
    baud: Option<u32>,

    /// Serial read/write timeout in milliseconds.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long)]
    quiet: bool,

    /// Path to a configuration file.
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
}

impl Cli {
    /// Resolve the run configuration: flags and environment first, then file values.
    fn run_config(&self, file: &Config) -> RunConfig {
        let defaults = RunConfig::default();
        RunConfig {
            device: self
                .device
                .clone()
                .or_else(|| file.connection.device.clone())
                .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            baud_rate: self
                .baud
                .or(file.connection.baud)
                .unwrap_or(defaults.baud_rate),
            timeout: self
                .timeout_ms
                .or(file.connection.timeout_ms)
                .map_or(defaults.timeout, Duration::from_millis),
            target: if self.bootloader {
                Target::Bootloader
            } else {
                Target::Firmware
            },
            force: self.force,
        }
    }
}

/// Render an error and its causes on one line, skipping causes already
/// spelled out by the message above them.
fn format_error(err: &anyhow::Error) -> String {
    let mut line = String::new();
    for cause in err.chain() {
        let text = cause.to_string();
        if line.contains(&text) {
            continue;
        }
        if !line.is_empty() {
            line.push_str(": ");
        }
        line.push_str(&text);
    }
    line
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // --- NO_COLOR and TTY detection ---
    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, Ordering::Relaxed);

    if env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    // Setup logging based on verbosity
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();

    debug!(
        "escape32-update v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", style("Error:").red().bold(), format_error(&err));
            ExitCode::FAILURE
        },
    }
}

fn run(cli: &Cli) -> Result<()> {
    let file_config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };
    let config = cli.run_config(&file_config);
    debug!("Run configuration: {config:?}");

    match &cli.image {
        Some(image) => commands::update::cmd_update(cli, &config, image),
        None => commands::info::cmd_info(cli, &config),
    }
}
