//! Firmware and bootloader update command implementation.

use anyhow::{Context, Result};
use console::style;
use escape32::{Image, RunConfig};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;

use super::connect;
use crate::{Cli, use_fancy_output};

/// Update command implementation.
pub(crate) fn cmd_update(cli: &Cli, config: &RunConfig, path: &Path) -> Result<()> {
    // Validate the image before touching the device
    let image = Image::load(path, config.target)
        .with_context(|| path.display().to_string())?;

    let mut session = connect(cli, config)?;

    if !cli.quiet {
        eprintln!(
            "{} Updating {}...",
            style("📦").cyan(),
            image.target()
        );
    }

    let fancy = !cli.quiet && use_fancy_output();
    let pb = if fancy {
        let pb = ProgressBar::new(100);
        #[allow(clippy::unwrap_used)] // Static template string
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}%")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb
    } else {
        ProgressBar::hidden()
    };

    let result = session.update(&image, |percent| {
        if fancy {
            pb.set_position(percent as u64);
        } else if !cli.quiet {
            eprintln!("{percent:4}%");
        }
    });

    if let Err(err) = result {
        pb.abandon();
        return Err(err.into());
    }
    pb.finish_and_clear();

    session.close()?;

    if !cli.quiet {
        eprintln!("{} Done!", style("✓").green().bold());
    }
    Ok(())
}
