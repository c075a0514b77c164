// src/commands/write.rs

//! Run crate generation

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use batchconvert_rocrate::config::{CrateSettings, RunCrateConfig};
use batchconvert_rocrate::provenance::RunCrateMaker;

use super::{resolve_journal_dir, resolve_param_dir};

/// Write a Workflow Run Crate for the last conversion
pub fn cmd_write(
    repo_dir: PathBuf,
    param_dir: Option<PathBuf>,
    journal_dir: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<()> {
    let param_dir = resolve_param_dir(param_dir)?;
    let journal_dir = resolve_journal_dir(journal_dir)?;

    let settings = match &config {
        Some(path) => CrateSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => CrateSettings::default(),
    };

    info!("Using parameters from {}", param_dir.display());
    let run_config = RunCrateConfig::new(repo_dir, param_dir, journal_dir).with_settings(settings);
    let maker = RunCrateMaker::new(run_config)?;
    let report = maker.write()?;

    println!("Run crate written to {}", report.crate_root().display());
    println!("  Layout: {}", report.outcome.topology);
    println!("  Original images: {}", report.outcome.image_dir.display());
    println!("  Converted images: {}", report.outcome.converted_image_dir.display());
    match report.custom_params {
        Some(count) => println!("  Customised parameters: {}", count),
        None => println!("  Customised parameters: unknown (no default parameters)"),
    }
    if report.log_included {
        println!("  Nextflow log: included");
    }
    if report.summary.datasets_copied > 0 {
        println!(
            "  Directories copied into the crate: {}",
            report.summary.datasets_copied
        );
    }

    Ok(())
}
