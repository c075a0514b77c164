// src/rocrate/writer.rs

//! Writing a crate to disk

use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{RoCrate, SourceKind, METADATA_FILE};
use crate::error::{Error, Result};
use crate::filesystem::path::safe_join;
use crate::filesystem::{copy_tree, file_digest};

/// What writing a crate did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Files copied into the crate
    pub files_copied: usize,
    /// Directories copied into the crate because they lay outside it
    pub datasets_copied: usize,
    /// Total size of all `File` entities
    pub total_bytes: u64,
}

impl RoCrate {
    /// Copy data entities into `crate_root` and write the metadata descriptor
    ///
    /// Files get `contentSize` and `sha256` from their copy inside the crate.
    /// Directories already at their destination are left alone; others are
    /// copied, which fails if the destination exists.
    pub fn write(&mut self, crate_root: &Path) -> Result<WriteSummary> {
        fs::create_dir_all(crate_root)?;
        let mut summary = WriteSummary::default();

        for source in self.sources.clone() {
            let dest = safe_join(crate_root, &source.id)?;

            match source.kind {
                SourceKind::File => {
                    if !same_location(&source.path, &dest) {
                        if !source.path.is_file() {
                            return Err(Error::NotFound(source.path.clone()));
                        }
                        if let Some(parent) = dest.parent() {
                            fs::create_dir_all(parent)?;
                        }
                        fs::copy(&source.path, &dest)?;
                        summary.files_copied += 1;
                        debug!("Copied {} to {}", source.path.display(), dest.display());
                    }

                    let digest = file_digest(&dest)?;
                    summary.total_bytes += digest.size;
                    if let Some(entity) = self.get_mut(&source.id) {
                        entity.set("contentSize", digest.size.to_string());
                        entity.set("sha256", digest.sha256);
                    }
                }
                SourceKind::Directory => {
                    if same_location(&source.path, &dest) {
                        continue;
                    }
                    if !source.path.is_dir() {
                        return Err(Error::NotFound(source.path.clone()));
                    }
                    if fs::symlink_metadata(&dest).is_ok() {
                        return Err(Error::IoError(format!(
                            "Cannot copy {} into the crate: {} already exists",
                            source.path.display(),
                            dest.display()
                        )));
                    }
                    warn!(
                        "{} lies outside the crate root, copying it to {}",
                        source.path.display(),
                        dest.display()
                    );
                    copy_tree(&source.path, &dest)?;
                    summary.datasets_copied += 1;
                }
            }
        }

        let json = serde_json::to_string_pretty(&self.to_json_ld())?;
        let mut tmp = tempfile::NamedTempFile::new_in(crate_root)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(crate_root.join(METADATA_FILE))
            .map_err(|e| Error::Io(e.error))?;

        info!(
            "Wrote {} ({} entities)",
            crate_root.join(METADATA_FILE).display(),
            self.entities.len()
        );
        Ok(summary)
    }
}

/// Whether two paths name the same existing filesystem object
fn same_location(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rocrate::Entity;
    use serde_json::Value;
    use tempfile::TempDir;

    fn read_metadata(root: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(root.join(METADATA_FILE)).unwrap()).unwrap()
    }

    #[test]
    fn test_write_copies_files_with_digest() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("params.json");
        fs::write(&source, "hello").unwrap();
        let root = temp.path().join("crate");

        let mut crate_ = RoCrate::new();
        crate_
            .add_file(&source, "params/params.json", &[])
            .unwrap()
            .set("name", "parameters");
        let summary = crate_.write(&root).unwrap();

        assert_eq!(summary.files_copied, 1);
        assert_eq!(summary.total_bytes, 5);
        assert_eq!(fs::read_to_string(root.join("params/params.json")).unwrap(), "hello");

        let doc = read_metadata(&root);
        let file = doc["@graph"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["@id"] == "params/params.json")
            .unwrap();
        assert_eq!(file["contentSize"], "5");
        assert_eq!(
            file["sha256"],
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(file["name"], "parameters");
    }

    #[test]
    fn test_write_leaves_datasets_in_place() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("crate");
        fs::create_dir_all(root.join("images")).unwrap();
        fs::write(root.join("images/a.tif"), "tiff").unwrap();

        let mut crate_ = RoCrate::new();
        crate_.add_directory(root.join("images"), "images").unwrap();
        let summary = crate_.write(&root).unwrap();

        assert_eq!(summary.datasets_copied, 0);
        assert!(root.join("images/a.tif").exists());
        assert!(root.join(METADATA_FILE).exists());
    }

    #[test]
    fn test_write_copies_outside_dataset() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("a/src");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("a.tif"), "tiff").unwrap();
        let root = temp.path().join("b/dst");

        let mut crate_ = RoCrate::new();
        crate_.add_directory(&outside, "src").unwrap();
        let summary = crate_.write(&root).unwrap();

        assert_eq!(summary.datasets_copied, 1);
        assert_eq!(fs::read_to_string(root.join("src/a.tif")).unwrap(), "tiff");
        assert!(outside.join("a.tif").exists());
    }

    #[test]
    fn test_write_refuses_to_overwrite_dataset() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("src");
        fs::create_dir_all(&outside).unwrap();
        let root = temp.path().join("crate");
        fs::create_dir_all(root.join("src")).unwrap();

        let mut crate_ = RoCrate::new();
        crate_.add_directory(&outside, "src").unwrap();
        assert!(crate_.write(&root).is_err());
        assert!(!root.join(METADATA_FILE).exists());
    }

    #[test]
    fn test_write_missing_file_source() {
        let temp = TempDir::new().unwrap();
        let mut crate_ = RoCrate::new();
        crate_
            .add_file(temp.path().join("missing"), "missing", &[])
            .unwrap();
        crate_.add(Entity::new("#x", &["Thing"]));

        let err = crate_.write(&temp.path().join("crate")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
