// src/reconcile/planner.rs

//! Reconciliation planner
//!
//! The planner classifies the directory pair, checks the pre-state and
//! builds the complete list of moves before anything on disk changes. A plan
//! is serialized into the journal so recovery knows exactly what to undo.

use crate::error::{Error, Result};
use crate::filesystem::path::{child_towards, normalize_absolute, sanitize_filename};
use crate::rocrate::METADATA_FILE;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::{classify, ReconcileConfig, ReconcileOutcome, Topology};

/// A single move into the staging directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMove {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// The complete reconciliation plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePlan {
    pub topology: Topology,
    /// Normalized input directory
    pub in_dir: PathBuf,
    /// Normalized output directory
    pub out_dir: PathBuf,
    /// Hidden directory collecting moved entries, sibling of `target_dir`
    pub staging_dir: PathBuf,
    /// Directory created by renaming `staging_dir`
    pub target_dir: PathBuf,
    /// Moves into `staging_dir`, in execution order
    pub moves: Vec<PlannedMove>,
    /// Layout after commit
    pub outcome: ReconcileOutcome,
}

/// Build a plan for reconciling `in_dir` and `out_dir`
///
/// Fails without side effects if either directory is missing, or if the
/// pair has already been reconciled.
pub fn plan_reconciliation(
    config: &ReconcileConfig,
    in_dir: &Path,
    out_dir: &Path,
    now: DateTime<Local>,
    tx_uuid: &str,
) -> Result<ReconcilePlan> {
    let topology = classify(in_dir, out_dir)?;
    let in_dir = normalize_absolute(in_dir)?;
    let out_dir = normalize_absolute(out_dir)?;

    for dir in [&in_dir, &out_dir] {
        if !dir.is_dir() {
            return Err(Error::NotFound(dir.clone()));
        }
    }

    let (target_dir, sources, outcome) = match topology {
        Topology::SameParent => {
            let parent = parent_of(&in_dir)?;
            let name = format!("{}{}", config.crate_dir_prefix, now.format("%Y_%m_%d_%H%M"));
            let target = parent.join(sanitize_filename(&name)?);
            let outcome = ReconcileOutcome {
                topology,
                image_dir: target.join(file_name_of(&in_dir)?),
                converted_image_dir: target.join(file_name_of(&out_dir)?),
                crate_root: target.clone(),
            };
            (target, vec![in_dir.clone(), out_dir.clone()], outcome)
        }
        Topology::OutputNestedInInput => {
            let target = in_dir.join(sanitize_filename(&config.images_subdir)?);
            let keep = child_towards(&in_dir, &out_dir);
            let outcome = ReconcileOutcome {
                topology,
                image_dir: target.clone(),
                converted_image_dir: out_dir.clone(),
                crate_root: in_dir.clone(),
            };
            (target, children_except(&in_dir, keep.as_deref())?, outcome)
        }
        Topology::InputNestedInOutput => {
            let target = out_dir.join(sanitize_filename(&config.converted_subdir)?);
            let keep = child_towards(&out_dir, &in_dir);
            let outcome = ReconcileOutcome {
                topology,
                image_dir: in_dir.clone(),
                converted_image_dir: target.clone(),
                crate_root: out_dir.clone(),
            };
            (target, children_except(&out_dir, keep.as_deref())?, outcome)
        }
        Topology::Unrelated => {
            let target = out_dir.join(sanitize_filename(&config.converted_subdir)?);
            let outcome = ReconcileOutcome {
                topology,
                image_dir: in_dir.clone(),
                converted_image_dir: target.clone(),
                crate_root: out_dir.clone(),
            };
            (target, children_except(&out_dir, None)?, outcome)
        }
    };

    preflight(&target_dir, &outcome.crate_root)?;

    let staging_dir = staging_path(&target_dir, tx_uuid)?;
    let moves = sources
        .into_iter()
        .map(|from| {
            let name = file_name_of(&from)?;
            Ok(PlannedMove {
                to: staging_dir.join(name),
                from,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ReconcilePlan {
        topology,
        in_dir,
        out_dir,
        staging_dir,
        target_dir,
        moves,
        outcome,
    })
}

/// Reject a tree that already has the reconciled layout
fn preflight(target_dir: &Path, crate_root: &Path) -> Result<()> {
    if fs::symlink_metadata(target_dir).is_ok() {
        return Err(Error::AlreadyReconciled(format!(
            "{} already exists",
            target_dir.display()
        )));
    }

    let metadata = crate_root.join(METADATA_FILE);
    if metadata.exists() {
        return Err(Error::AlreadyReconciled(format!(
            "{} already contains {}",
            crate_root.display(),
            METADATA_FILE
        )));
    }

    Ok(())
}

/// Direct children of `dir` in name order, skipping `keep`
fn children_except(dir: &Path, keep: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if keep != Some(path.as_path()) {
            children.push(path);
        }
    }
    children.sort();
    Ok(children)
}

fn staging_path(target_dir: &Path, tx_uuid: &str) -> Result<PathBuf> {
    let parent = parent_of(target_dir)?;
    let mut name = OsString::from(".");
    name.push(file_name_of(target_dir)?);
    name.push(format!(".staging-{}", tx_uuid));
    Ok(parent.join(name))
}

fn parent_of(path: &Path) -> Result<&Path> {
    path.parent()
        .ok_or_else(|| Error::InvalidPath(format!("{} has no parent", path.display())))
}

fn file_name_of(path: &Path) -> Result<OsString> {
    path.file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| Error::InvalidPath(format!("{} has no file name", path.display())))
}
