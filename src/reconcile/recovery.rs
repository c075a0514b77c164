// src/reconcile/recovery.rs

//! Recovery of interrupted reconciliations
//!
//! - Before COMMITTED: roll back (move staged entries back, drop staging)
//! - After COMMITTED: roll forward (archive the journal)
//!
//! The filesystem decides whether the commit rename happened, since a crash
//! can land between the rename and the `Committed` record: if the staging
//! directory is gone and the target exists, the new layout stands.

use crate::error::Result;
use crate::filesystem::{is_empty_dir, move_path_atomic};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use super::journal::{find_incomplete_journals, ReconcileJournal};
use super::{ReconcileConfig, ReconcilePlan};

/// Outcome of recovering one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Original layout restored
    RolledBack {
        tx_uuid: String,
        reason: String,
        restored: usize,
    },
    /// Commit had happened, journal archived
    RolledForward { tx_uuid: String, crate_root: PathBuf },
    /// Journal unreadable, manual intervention needed
    Corrupted { tx_uuid: String, error: String },
    /// Nothing had been planned yet
    Clean { tx_uuid: String },
}

impl RecoveryOutcome {
    pub fn tx_uuid(&self) -> &str {
        match self {
            Self::RolledBack { tx_uuid, .. }
            | Self::RolledForward { tx_uuid, .. }
            | Self::Corrupted { tx_uuid, .. }
            | Self::Clean { tx_uuid } => tx_uuid,
        }
    }
}

/// Recover every incomplete reconciliation in the journal directory
pub fn recover_all(config: &ReconcileConfig) -> Result<Vec<RecoveryOutcome>> {
    let journals = find_incomplete_journals(&config.journal_dir)?;
    let mut outcomes = Vec::new();

    for journal_path in journals {
        outcomes.push(recover_single(journal_path)?);
    }

    Ok(outcomes)
}

fn recover_single(journal_path: PathBuf) -> Result<RecoveryOutcome> {
    let journal = match ReconcileJournal::open(journal_path) {
        Ok(j) => j,
        Err(e) => {
            return Ok(RecoveryOutcome::Corrupted {
                tx_uuid: "unknown".to_string(),
                error: format!("Failed to open journal: {}", e),
            });
        }
    };

    let tx_uuid = journal.tx_uuid().to_string();
    let plan = match journal.plan() {
        Ok(Some(plan)) => plan,
        Ok(None) => {
            // Crashed before the plan was durable; nothing moved
            journal.delete()?;
            return Ok(RecoveryOutcome::Clean { tx_uuid });
        }
        Err(e) => {
            return Ok(RecoveryOutcome::Corrupted {
                tx_uuid,
                error: format!("Failed to read journal: {}", e),
            });
        }
    };

    let last_phase = journal.last_phase()?;
    info!(
        "Recovering reconciliation {} (last phase: {:?})",
        tx_uuid, last_phase
    );

    let committed = !last_phase.should_roll_back()
        || (!plan.staging_dir.exists() && plan.target_dir.exists());

    if committed {
        let crate_root = plan.outcome.crate_root.clone();
        journal.archive()?;
        return Ok(RecoveryOutcome::RolledForward { tx_uuid, crate_root });
    }

    let restored = rollback_plan(&plan)?;
    journal.delete()?;
    Ok(RecoveryOutcome::RolledBack {
        tx_uuid,
        reason: format!("Interrupted before commit (phase: {:?})", last_phase),
        restored,
    })
}

/// Move staged entries back to their original locations
///
/// Only entries found at their staging location are restored, in reverse
/// order. The staging directory is removed once empty. Returns the number of
/// entries restored.
pub fn rollback_plan(plan: &ReconcilePlan) -> Result<usize> {
    let mut restored = 0;

    for planned in plan.moves.iter().rev() {
        if fs::symlink_metadata(&planned.to).is_err() {
            continue;
        }
        if fs::symlink_metadata(&planned.from).is_ok() {
            // Interrupted EXDEV copy: the source is still complete
            warn!(
                "Both {} and {} exist; keeping the original",
                planned.from.display(),
                planned.to.display()
            );
            remove_any(&planned.to)?;
            continue;
        }
        move_path_atomic(&planned.to, &planned.from)?;
        restored += 1;
    }

    if plan.staging_dir.is_dir() {
        if is_empty_dir(&plan.staging_dir)? {
            fs::remove_dir(&plan.staging_dir)?;
        } else {
            warn!(
                "Staging directory {} not empty after rollback, leaving it in place",
                plan.staging_dir.display()
            );
        }
    }

    Ok(restored)
}

fn remove_any(path: &std::path::Path) -> std::io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
