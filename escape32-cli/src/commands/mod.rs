//! Command implementations.
//!
//! The tool runs in one of two modes depending on whether an image is given.

pub(crate) mod info;
pub(crate) mod update;

use anyhow::Result;
use console::style;
use escape32::{Link, NativePort, RunConfig, Session};

use crate::Cli;

/// Session over the native serial port.
pub(crate) type DeviceSession = Session<Link<NativePort>>;

/// Open the configured device and check that the ESC answers.
pub(crate) fn connect(cli: &Cli, config: &RunConfig) -> Result<DeviceSession> {
    if !cli.quiet {
        eprintln!(
            "{} Connecting to ESC via '{}'...",
            style("🔌").cyan(),
            config.device
        );
    }

    let mut session = Session::open(config)?;
    session.probe()?;
    Ok(session)
}
