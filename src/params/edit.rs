// src/params/edit.rs

//! In-place editing of parameter files
//!
//! BatchConvert stores one entry per command-line argument in `params.json`.
//! A missing file is seeded from its default document before editing.

use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use super::ParamValue;
use crate::error::{Error, Result};

/// What an edit did to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Added,
    Replaced,
    Removed,
    /// Deleting a key that was not present
    Unchanged,
}

/// Encode a value the way the upstream tool writes it
fn upstream_json(value: &ParamValue) -> Value {
    match value {
        ParamValue::Boolean(true) => Value::String("True".to_string()),
        ParamValue::Boolean(false) => Value::String("False".to_string()),
        other => other.to_json(),
    }
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| Error::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

fn write_object(path: &Path, map: &Map<String, Value>) -> Result<()> {
    let json = serde_json::to_string_pretty(map)?;
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;

    // Replace the file in one rename so readers never see a partial document
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Open a parameter file, seeding it from `default_file` if it is missing
fn load_or_seed(file: &Path, default_file: Option<&Path>) -> Result<Map<String, Value>> {
    if file.exists() {
        return read_object(file);
    }

    match default_file {
        Some(default_file) if default_file.exists() => {
            debug!(
                "Seeding {} from {}",
                file.display(),
                default_file.display()
            );
            read_object(default_file)
        }
        Some(default_file) => Err(Error::NotFound(default_file.to_path_buf())),
        None => Ok(Map::new()),
    }
}

/// Add or replace a parameter
pub fn set_param(
    file: &Path,
    default_file: Option<&Path>,
    key: &str,
    value: &ParamValue,
) -> Result<EditOutcome> {
    let mut map = load_or_seed(file, default_file)?;

    let outcome = match map.insert(key.to_string(), upstream_json(value)) {
        Some(_) => EditOutcome::Replaced,
        None => EditOutcome::Added,
    };

    write_object(file, &map)?;
    Ok(outcome)
}

/// Remove a parameter if present
pub fn delete_param(file: &Path, default_file: Option<&Path>, key: &str) -> Result<EditOutcome> {
    let mut map = load_or_seed(file, default_file)?;

    // shift_remove keeps the order of the remaining keys
    let outcome = match map.shift_remove(key) {
        Some(_) => EditOutcome::Removed,
        None => EditOutcome::Unchanged,
    };

    write_object(file, &map)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterDocument;
    use tempfile::TempDir;

    #[test]
    fn test_set_seeds_from_default() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("params.json");
        let default_file = temp_dir.path().join("params.json.default");
        fs::write(&default_file, r#"{"output_type": "ometiff", "merge_files": "False"}"#).unwrap();

        let outcome = set_param(
            &file,
            Some(&default_file),
            "merge_files",
            &ParamValue::Boolean(true),
        )
        .unwrap();
        assert_eq!(outcome, EditOutcome::Replaced);

        let content = fs::read_to_string(&file).unwrap();
        assert!(content.contains(r#""merge_files": "True""#));

        let doc = ParameterDocument::load(&file).unwrap();
        let keys: Vec<&str> = doc.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["output_type", "merge_files"]);
        // Default file is untouched
        assert!(fs::read_to_string(&default_file).unwrap().contains("False"));
    }

    #[test]
    fn test_set_adds_new_key() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("params.json");
        fs::write(&file, r#"{"a": 1}"#).unwrap();

        let outcome = set_param(&file, None, "b", &ParamValue::Integer(3)).unwrap();
        assert_eq!(outcome, EditOutcome::Added);

        let doc = ParameterDocument::load(&file).unwrap();
        assert_eq!(doc.get("b"), Some(&ParamValue::Integer(3)));
    }

    #[test]
    fn test_delete_key() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("params.json");
        fs::write(&file, r#"{"a": 1, "b": 2, "c": 3}"#).unwrap();

        assert_eq!(delete_param(&file, None, "b").unwrap(), EditOutcome::Removed);
        assert_eq!(delete_param(&file, None, "zz").unwrap(), EditOutcome::Unchanged);

        let doc = ParameterDocument::load(&file).unwrap();
        let keys: Vec<&str> = doc.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_missing_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("params.json");
        let default_file = temp_dir.path().join("missing.default");

        let err = set_param(&file, Some(&default_file), "a", &ParamValue::Integer(1)).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(!file.exists());
    }
}
