// src/commands/params.rs

//! Parameter file editing commands

use anyhow::Result;
use std::ffi::OsString;
use std::path::PathBuf;

use batchconvert_rocrate::params::{
    delete_param, set_param, EditOutcome, ParamValue, PARAMS_FILE,
};

use super::resolve_param_dir;

/// Parameter file and the document seeding it
fn resolve_files(
    file: Option<PathBuf>,
    default_file: Option<PathBuf>,
) -> Result<(PathBuf, PathBuf)> {
    let file = match file {
        Some(file) => file,
        None => resolve_param_dir(None)?.join(PARAMS_FILE),
    };
    let default_file = default_file.unwrap_or_else(|| {
        let mut name = OsString::from(file.as_os_str());
        name.push(".default");
        PathBuf::from(name)
    });
    Ok((file, default_file))
}

/// Add or replace a parameter
pub fn cmd_params_set(
    key: &str,
    value: &str,
    file: Option<PathBuf>,
    default_file: Option<PathBuf>,
) -> Result<()> {
    let (file, default_file) = resolve_files(file, default_file)?;
    // Stored as typed, the way BatchConvert writes its own parameters
    let value = ParamValue::Text(value.to_string());

    match set_param(&file, Some(&default_file), key, &value)? {
        EditOutcome::Added => println!("Added {} = {} to {}", key, value, file.display()),
        _ => println!("Set {} = {} in {}", key, value, file.display()),
    }
    Ok(())
}

/// Remove a parameter
pub fn cmd_params_delete(
    key: &str,
    file: Option<PathBuf>,
    default_file: Option<PathBuf>,
) -> Result<()> {
    let (file, default_file) = resolve_files(file, default_file)?;

    match delete_param(&file, Some(&default_file), key)? {
        EditOutcome::Removed => println!("Removed {} from {}", key, file.display()),
        _ => println!("{} is not set in {}", key, file.display()),
    }
    Ok(())
}
