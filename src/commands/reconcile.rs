// src/commands/reconcile.rs

//! Directory reconciliation and crash recovery commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use batchconvert_rocrate::reconcile::{ReconcileConfig, Reconciler, RecoveryOutcome};

use super::resolve_journal_dir;

/// Make a command-line path absolute against the working directory
fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Invalid path {}", path.display()))
}

/// Reconcile two directories, or show what would happen
pub fn cmd_reconcile(
    in_dir: PathBuf,
    out_dir: PathBuf,
    journal_dir: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let config = ReconcileConfig::new(resolve_journal_dir(journal_dir)?);
    let reconciler = Reconciler::new(config)?;
    let in_dir = absolute(&in_dir)?;
    let out_dir = absolute(&out_dir)?;

    if dry_run {
        let plan = reconciler.plan(&in_dir, &out_dir)?;
        println!("Layout: {}", plan.topology);
        println!("Would create {}", plan.target_dir.display());
        for planned in &plan.moves {
            let name = planned.to.file_name().unwrap_or_default();
            println!(
                "  {} -> {}",
                planned.from.display(),
                plan.target_dir.join(name).display()
            );
        }
        println!("Crate root: {}", plan.outcome.crate_root.display());
        return Ok(());
    }

    let outcome = reconciler.reconcile(&in_dir, &out_dir)?;
    println!("Reconciled ({})", outcome.topology);
    println!("  Crate root: {}", outcome.crate_root.display());
    println!("  Original images: {}", outcome.image_dir.display());
    println!("  Converted images: {}", outcome.converted_image_dir.display());
    Ok(())
}

/// Recover interrupted reconciliations
pub fn cmd_recover(journal_dir: Option<PathBuf>) -> Result<()> {
    let config = ReconcileConfig::new(resolve_journal_dir(journal_dir)?);
    let reconciler = Reconciler::new(config)?;
    let outcomes = reconciler.recover()?;

    if outcomes.is_empty() {
        println!("No interrupted reconciliations found.");
        return Ok(());
    }

    let mut corrupted = 0;
    for outcome in &outcomes {
        match outcome {
            RecoveryOutcome::RolledBack {
                tx_uuid,
                reason,
                restored,
            } => {
                println!("[{}] rolled back: {} ({} entries restored)", tx_uuid, reason, restored);
            }
            RecoveryOutcome::RolledForward {
                tx_uuid,
                crate_root,
            } => {
                println!("[{}] completed: crate root {}", tx_uuid, crate_root.display());
            }
            RecoveryOutcome::Corrupted { tx_uuid, error } => {
                corrupted += 1;
                println!("[{}] needs manual attention: {}", tx_uuid, error);
            }
            RecoveryOutcome::Clean { tx_uuid } => {
                println!("[{}] nothing to recover", tx_uuid);
            }
        }
    }

    if corrupted > 0 {
        return Err(anyhow::anyhow!(
            "{} journal(s) could not be recovered",
            corrupted
        ));
    }
    Ok(())
}
