// src/filesystem/mod.rs

//! Filesystem operations used while reconciling and writing crates
//!
//! This module provides:
//! - Path sanitization and lexical path relationships (`path`)
//! - Moves that survive cross-filesystem boundaries
//! - Recursive directory copies for datasets outside the crate root
//! - SHA-256 digests for files recorded in crate metadata

pub mod path;

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Move a file or directory, falling back to copy+sync+delete across filesystems.
///
/// A same-filesystem move is a single `rename`. The EXDEV fallback copies the
/// whole tree, fsyncs it, then removes the source, so an interruption leaves
/// the source intact.
pub fn move_path_atomic(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc::EXDEV) => {
            debug!(
                "Cross-filesystem move detected ({} -> {}), using copy fallback",
                src.display(),
                dst.display()
            );

            let metadata = fs::symlink_metadata(src)?;
            if metadata.is_dir() {
                copy_tree(src, dst)?;
                sync_tree(dst)?;
                fs::remove_dir_all(src)?;
            } else {
                fs::copy(src, dst)?;
                File::open(dst)?.sync_all()?;
                fs::remove_file(src)?;
            }

            if let Some(parent) = dst.parent()
                && let Ok(dir) = File::open(parent)
            {
                // Not all filesystems support fsync on directories
                let _ = dir.sync_all();
            }

            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Recursively copy a directory tree, creating `dst`
///
/// Symlinks are recreated rather than followed.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            #[cfg(unix)]
            std::os::unix::fs::symlink(fs::read_link(entry.path())?, &target)?;
            #[cfg(not(unix))]
            fs::copy(entry.path(), &target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn sync_tree(root: &Path) -> io::Result<()> {
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file() {
            File::open(entry.path())?.sync_all()?;
        }
    }
    Ok(())
}

/// Check whether a directory has no entries
pub fn is_empty_dir(path: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}

/// Size and SHA-256 digest of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    pub size: u64,
    pub sha256: String,
}

/// Compute the size and SHA-256 of a file
pub fn file_digest(path: &Path) -> Result<FileDigest> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
        _ => Error::Io(e),
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    let mut size = 0u64;

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        size += read as u64;
    }

    Ok(FileDigest {
        size,
        sha256: hex::encode(hasher.finalize()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_move_path_atomic_file() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("source.txt");
        let dst = temp_dir.path().join("dest.txt");

        fs::write(&src, "test content").unwrap();
        move_path_atomic(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "test content");
    }

    #[test]
    fn test_move_path_atomic_directory() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("images");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("nested/a.tif"), b"tiff").unwrap();

        let dst = temp_dir.path().join("moved");
        move_path_atomic(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("nested/a.tif")).unwrap(), b"tiff");
    }

    #[test]
    fn test_copy_tree() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir_all(src.join("a/b")).unwrap();
        fs::write(src.join("top.txt"), "top").unwrap();
        fs::write(src.join("a/b/deep.txt"), "deep").unwrap();
        fs::create_dir_all(src.join("empty")).unwrap();

        let dst = temp_dir.path().join("dst");
        copy_tree(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("top.txt")).unwrap(), "top");
        assert_eq!(fs::read_to_string(dst.join("a/b/deep.txt")).unwrap(), "deep");
        assert!(dst.join("empty").is_dir());
        // Source untouched
        assert!(src.join("a/b/deep.txt").exists());
    }

    #[test]
    fn test_file_digest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hello.txt");
        fs::write(&path, "hello").unwrap();

        let digest = file_digest(&path).unwrap();
        assert_eq!(digest.size, 5);
        assert_eq!(
            digest.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_file_digest_missing() {
        let err = file_digest(Path::new("/nonexistent/file")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_is_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(is_empty_dir(temp_dir.path()).unwrap());
        fs::write(temp_dir.path().join("x"), "").unwrap();
        assert!(!is_empty_dir(temp_dir.path()).unwrap());
    }
}
