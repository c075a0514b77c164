// src/commands/mod.rs
//! Command handlers for the batchconvert-rocrate CLI

mod diff;
mod params;
mod reconcile;
mod system;
mod write;

pub use diff::cmd_diff;
pub use params::{cmd_params_delete, cmd_params_set};
pub use reconcile::{cmd_reconcile, cmd_recover};
pub use system::cmd_completions;
pub use write::cmd_write;

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Per-user BatchConvert directory
fn batchconvert_home() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine the home directory")?;
    Ok(home.join(".batchconvert"))
}

/// Parameter directory, defaulting to where BatchConvert writes it
pub(crate) fn resolve_param_dir(param_dir: Option<PathBuf>) -> Result<PathBuf> {
    match param_dir {
        Some(dir) => Ok(dir),
        None => Ok(batchconvert_home()?.join("params")),
    }
}

/// Journal directory, defaulting to one next to the parameter directory
pub(crate) fn resolve_journal_dir(journal_dir: Option<PathBuf>) -> Result<PathBuf> {
    match journal_dir {
        Some(dir) => Ok(dir),
        None => Ok(batchconvert_home()?.join("journal")),
    }
}
