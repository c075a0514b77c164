// src/commands/diff.rs

//! Custom parameter listing

use anyhow::Result;
use serde_json::{Map, Value};
use std::path::PathBuf;

use batchconvert_rocrate::params::{ParamDiff, ParamPaths};

use super::resolve_param_dir;

/// Print the parameters of the last run that differ from the defaults
pub fn cmd_diff(param_dir: Option<PathBuf>, json: bool) -> Result<()> {
    let paths = ParamPaths::in_dir(resolve_param_dir(param_dir)?);
    let diff = ParamDiff::from_files(&paths.params, &paths.defaults)?;

    if json {
        let object: Map<String, Value> = diff
            .pairs()
            .map(|(key, value)| (key.to_string(), value.to_json()))
            .collect();
        println!("{}", serde_json::to_string_pretty(&object)?);
        return Ok(());
    }

    if diff.is_empty() {
        println!("All {} parameters have their default value.", diff.unchanged);
        return Ok(());
    }

    println!("Customised parameters ({}):", diff.len());
    for param in &diff.custom {
        println!("  {}", param.description());
    }
    println!("Unchanged: {}", diff.unchanged);

    Ok(())
}
