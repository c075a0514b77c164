// src/filesystem/path.rs

//! Path sanitization and comparison utilities
//!
//! Crate destination paths come from configuration and parameter files, so
//! they are sanitized before being joined onto a crate root. Directory
//! relationships are decided lexically on normalized absolute paths.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Sanitize a relative destination path
///
/// This function:
/// 1. Rejects paths containing `..` (parent directory) components
/// 2. Skips `.` (current directory) components
/// 3. Strips leading slashes to make the path relative
/// 4. Returns an error for empty paths
///
/// # Examples
///
/// ```
/// use batchconvert_rocrate::filesystem::path::sanitize_path;
/// use std::path::PathBuf;
///
/// assert_eq!(sanitize_path("params/params.json").unwrap(), PathBuf::from("params/params.json"));
/// assert_eq!(sanitize_path("/logs/nextflow.log").unwrap(), PathBuf::from("logs/nextflow.log"));
/// assert!(sanitize_path("../etc/passwd").is_err());
/// ```
pub fn sanitize_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();

    let relative = path_str.trim_start_matches('/');

    let mut normalized = PathBuf::new();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::PathTraversal(path_str.to_string()));
            }
            Component::Prefix(_) | Component::RootDir => {}
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(Error::InvalidPath("Empty path after sanitization".to_string()));
    }

    Ok(normalized)
}

/// Join a root with a sanitized relative path
///
/// The result cannot escape `root`.
pub fn safe_join(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<PathBuf> {
    let sanitized = sanitize_path(path.as_ref())?;
    Ok(root.as_ref().join(sanitized))
}

/// Normalize an absolute directory path
///
/// `.` components and trailing separators are dropped. Relative paths and
/// `..` components are rejected, since they would make the lexical
/// comparisons in [`is_within`] meaningless.
pub fn normalize_absolute(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if !path.is_absolute() {
        return Err(Error::InvalidPath(format!(
            "{} is not an absolute path",
            path.display()
        )));
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => normalized.push(p.as_os_str()),
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::Normal(c) => normalized.push(c),
            Component::ParentDir => {
                return Err(Error::PathTraversal(path.display().to_string()));
            }
        }
    }

    Ok(normalized)
}

/// Whether `path` is a strict descendant of `ancestor`
///
/// Both paths must already be normalized. Comparison is per component, so
/// `/data/src2` is not within `/data/src`.
pub fn is_within(path: &Path, ancestor: &Path) -> bool {
    path != ancestor && path.starts_with(ancestor)
}

/// The direct child of `ancestor` on the way down to `path`
pub fn child_towards(ancestor: &Path, path: &Path) -> Option<PathBuf> {
    let rest = path.strip_prefix(ancestor).ok()?;
    let first = rest.components().next()?;
    Some(ancestor.join(first.as_os_str()))
}

/// Sanitize a single path component
///
/// Stricter than [`sanitize_path`]: any separator is rejected.
pub fn sanitize_filename(name: &str) -> Result<String> {
    if name.contains('/') || name.contains('\\') {
        return Err(Error::PathTraversal(format!(
            "Filename contains path separator: {}",
            name
        )));
    }

    if name == ".." || name == "." {
        return Err(Error::PathTraversal(format!("Invalid filename: {}", name)));
    }

    if name.is_empty() {
        return Err(Error::InvalidPath("Empty filename".to_string()));
    }

    Ok(name.to_string())
}
