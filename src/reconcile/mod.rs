// src/reconcile/mod.rs

//! Directory reconciliation for crate writing
//!
//! Datasets referenced by a crate are copied into it unless they already sit
//! under the crate root. Image datasets can be large, so before the crate is
//! written the input and output directories of a conversion are moved into a
//! layout where the crate root contains both, and no file exists twice.
//!
//! # Topologies
//!
//! ```text
//! SameParent           /p/in, /p/out      -> /p/batchconvert_wfrun_rocrate_<ts>/{in,out}
//! OutputNestedInInput  /in, /in/out       -> /in/images/*, /in/out untouched
//! InputNestedInOutput  /out/in, /out      -> /out/converted_images/*, /out/in untouched
//! Unrelated            /a/in, /b/out      -> /b/out/converted_images/*, /a/in untouched
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! NEW -> PLANNED -> STAGING_CREATED -> STAGED -> COMMITTED -> DONE
//!                                                  ^
//!                            single rename of the staging directory
//! ```
//!
//! Every reconciliation is journaled. Before the commit rename, recovery moves
//! staged entries back to where they came from; after it, recovery only
//! archives the journal.

mod journal;
mod planner;
mod recovery;

pub use journal::{find_incomplete_journals, JournalRecord, ReconcileJournal};
pub use planner::{plan_reconciliation, PlannedMove, ReconcilePlan};
pub use recovery::{recover_all, rollback_plan, RecoveryOutcome};

use crate::error::{Error, Result};
use crate::filesystem::move_path_atomic;
use crate::filesystem::path::{is_within, normalize_absolute};
use chrono::{DateTime, Local, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Subdirectory receiving the original images when the output is nested in the input
pub const IMAGES_SUBDIR: &str = "images";

/// Subdirectory receiving the converted images when the output directory is the crate root
pub const CONVERTED_IMAGES_SUBDIR: &str = "converted_images";

/// Prefix of the crate directory created for sibling input/output directories
pub const CRATE_DIR_PREFIX: &str = "batchconvert_wfrun_rocrate_";

/// Name of the lock file inside the journal directory
const LOCK_FILE: &str = "reconcile.lock";

/// Relationship between the input and output directories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    /// Both directories share a parent
    SameParent,
    /// The output directory lies below the input directory
    OutputNestedInInput,
    /// The input directory lies below the output directory
    InputNestedInOutput,
    /// Neither contains the other and their parents differ
    Unrelated,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Topology::SameParent => "same-parent",
            Topology::OutputNestedInInput => "output-nested-in-input",
            Topology::InputNestedInOutput => "input-nested-in-output",
            Topology::Unrelated => "unrelated",
        };
        f.write_str(name)
    }
}

/// Classify two directories
///
/// Paths must be absolute; they are normalized before comparison. Identical
/// directories and the filesystem root are rejected since no layout can
/// separate them.
pub fn classify(in_dir: &Path, out_dir: &Path) -> Result<Topology> {
    let in_dir = normalize_absolute(in_dir)?;
    let out_dir = normalize_absolute(out_dir)?;

    if in_dir == out_dir {
        return Err(Error::InvalidPath(format!(
            "input and output directories are both {}",
            in_dir.display()
        )));
    }

    let (Some(in_parent), Some(out_parent)) = (in_dir.parent(), out_dir.parent()) else {
        return Err(Error::InvalidPath(
            "the filesystem root cannot be reconciled".to_string(),
        ));
    };

    let topology = if in_parent == out_parent {
        Topology::SameParent
    } else if is_within(&out_dir, &in_dir) {
        Topology::OutputNestedInInput
    } else if is_within(&in_dir, &out_dir) {
        Topology::InputNestedInOutput
    } else {
        Topology::Unrelated
    };

    Ok(topology)
}

/// Where the directories ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub topology: Topology,
    /// Directory holding the original images
    pub image_dir: PathBuf,
    /// Directory holding the converted images
    pub converted_image_dir: PathBuf,
    /// Directory that becomes the crate root
    pub crate_root: PathBuf,
}

/// Reconciliation configuration
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Directory for reconciliation journals and the lock file
    pub journal_dir: PathBuf,
    /// Subdirectory name for original images (output nested in input)
    pub images_subdir: String,
    /// Subdirectory name for converted images (output is the crate root)
    pub converted_subdir: String,
    /// Prefix for the crate directory created for sibling directories
    pub crate_dir_prefix: String,
}

impl ReconcileConfig {
    /// Create a config with the standard directory names
    pub fn new(journal_dir: impl Into<PathBuf>) -> Self {
        Self {
            journal_dir: journal_dir.into(),
            images_subdir: IMAGES_SUBDIR.to_string(),
            converted_subdir: CONVERTED_IMAGES_SUBDIR.to_string(),
            crate_dir_prefix: CRATE_DIR_PREFIX.to_string(),
        }
    }

    fn archive_dir(&self) -> PathBuf {
        self.journal_dir.join("archive")
    }
}

/// Reconciliation state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileState {
    /// Journal created, nothing moved
    New,
    /// Plan recorded
    Planned,
    /// Empty staging directory exists
    StagingCreated,
    /// All entries moved into the staging directory
    Staged,
    /// Staging directory renamed onto the target - POINT OF NO RETURN
    Committed,
    /// Journal complete
    Done,
}

impl ReconcileState {
    /// Returns true if recovery should restore the original layout
    pub fn should_roll_back(&self) -> bool {
        matches!(
            self,
            Self::New | Self::Planned | Self::StagingCreated | Self::Staged
        )
    }
}

/// Exclusive lock on the journal directory, released on drop
struct ReconcileLock {
    file: File,
}

impl Drop for ReconcileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Executes journaled reconciliations
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    /// Create a reconciler, ensuring the journal directories exist
    pub fn new(config: ReconcileConfig) -> Result<Self> {
        fs::create_dir_all(&config.journal_dir)?;
        fs::create_dir_all(config.archive_dir())?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    fn lock(&self) -> Result<ReconcileLock> {
        let lock_path = self.config.journal_dir.join(LOCK_FILE);
        let file = File::create(&lock_path)?;
        file.try_lock_exclusive()
            .map_err(|_| Error::Locked(lock_path.clone()))?;
        Ok(ReconcileLock { file })
    }

    /// Compute what a reconciliation would do without touching the filesystem
    pub fn plan(&self, in_dir: &Path, out_dir: &Path) -> Result<ReconcilePlan> {
        let tx_uuid = Uuid::new_v4().to_string();
        plan_reconciliation(&self.config, in_dir, out_dir, Local::now(), &tx_uuid)
    }

    /// Reconcile the directories of a conversion run
    pub fn reconcile(&self, in_dir: &Path, out_dir: &Path) -> Result<ReconcileOutcome> {
        self.reconcile_at(in_dir, out_dir, Local::now())
    }

    /// Reconcile using `now` for the crate directory timestamp
    pub fn reconcile_at(
        &self,
        in_dir: &Path,
        out_dir: &Path,
        now: DateTime<Local>,
    ) -> Result<ReconcileOutcome> {
        let _lock = self.lock()?;

        let pending = find_incomplete_journals(&self.config.journal_dir)?;
        if !pending.is_empty() {
            return Err(Error::Journal(format!(
                "{} incomplete reconciliation(s) in {}; run recovery first",
                pending.len(),
                self.config.journal_dir.display()
            )));
        }

        let tx_uuid = Uuid::new_v4().to_string();
        let plan = plan_reconciliation(&self.config, in_dir, out_dir, now, &tx_uuid)?;
        self.execute(&tx_uuid, plan)
    }

    /// Journal and apply a plan; the caller holds the lock
    fn execute(&self, tx_uuid: &str, plan: ReconcilePlan) -> Result<ReconcileOutcome> {
        info!(
            "Reconciling {} and {} ({}, {} entries to move)",
            plan.in_dir.display(),
            plan.out_dir.display(),
            plan.topology,
            plan.moves.len()
        );

        let start = Utc::now();
        let mut journal = ReconcileJournal::create(&self.config.journal_dir, tx_uuid)?;
        journal.write_barrier(JournalRecord::Begin {
            tx_uuid: tx_uuid.to_string(),
            in_dir: plan.in_dir.clone(),
            out_dir: plan.out_dir.clone(),
            timestamp: start,
        })?;
        journal.write_barrier(JournalRecord::Plan { plan: plan.clone() })?;

        if let Err(e) = apply(&plan, &mut journal) {
            return Err(abandon(&plan, journal, e));
        }

        // Past the commit rename the new layout stands even if the journal
        // cannot be finalized; recovery rolls such journals forward.
        let duration_ms = Utc::now()
            .signed_duration_since(start)
            .num_milliseconds()
            .max(0) as u64;
        let finalized = journal
            .write_barrier(JournalRecord::Done {
                duration_ms,
                success: true,
            })
            .and_then(|()| journal.archive());
        if let Err(e) = finalized {
            warn!("Failed to finalize reconciliation journal: {}", e);
        }

        info!("Crate root: {}", plan.outcome.crate_root.display());
        Ok(plan.outcome)
    }

    /// Roll back or forward any interrupted reconciliations
    pub fn recover(&self) -> Result<Vec<RecoveryOutcome>> {
        let _lock = self.lock()?;
        recover_all(&self.config)
    }
}

/// Undo a failed [`apply`] in-process and hand back its error
///
/// The journal stays behind for an explicit recovery run unless the original
/// layout was restored.
fn abandon(plan: &ReconcilePlan, journal: ReconcileJournal, err: Error) -> Error {
    warn!(
        "Reconciliation {} failed, rolling back: {}",
        journal.tx_uuid(),
        err
    );
    match rollback_plan(plan) {
        Ok(restored) => {
            debug!("Restored {} entries", restored);
            let path = journal.path().to_path_buf();
            if let Err(e) = journal.delete() {
                warn!("Failed to remove journal {}: {}", path.display(), e);
            }
        }
        Err(rollback_err) => {
            warn!(
                "Rollback of {} incomplete: {}; journal kept at {}",
                journal.tx_uuid(),
                rollback_err,
                journal.path().display()
            );
        }
    }
    err
}

/// Stage every planned move, then commit with a single rename
fn apply(plan: &ReconcilePlan, journal: &mut ReconcileJournal) -> Result<()> {
    fs::create_dir(&plan.staging_dir)?;
    journal.write_barrier(JournalRecord::StagingCreated {
        path: plan.staging_dir.clone(),
    })?;

    for planned in &plan.moves {
        move_path_atomic(&planned.from, &planned.to).map_err(|e| {
            Error::IoError(format!(
                "Failed to move {} to {}: {}",
                planned.from.display(),
                planned.to.display(),
                e
            ))
        })?;
        debug!("Staged {}", planned.from.display());
        journal.write(JournalRecord::Moved {
            from: planned.from.clone(),
            to: planned.to.clone(),
        })?;
    }

    journal.write_barrier(JournalRecord::Staged {
        count: plan.moves.len(),
    })?;

    fs::rename(&plan.staging_dir, &plan.target_dir)?;

    if let Err(e) = journal.write_barrier(JournalRecord::Committed {
        crate_root: plan.outcome.crate_root.clone(),
    }) {
        warn!("Failed to record commit of {}: {}", plan.target_dir.display(), e);
    }

    Ok(())
}
