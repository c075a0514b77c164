// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// A scratch directory with a BatchConvert checkout and parameter directory.
///
/// Keep the value alive for the duration of the test to prevent cleanup.
pub struct Workspace {
    _temp: TempDir,
    pub root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        // Canonical so comparisons survive symlinked temp dirs
        let root = temp.path().canonicalize().unwrap();
        Self { _temp: temp, root }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Create a file with `content`, creating parents as needed
    pub fn touch(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn journal_dir(&self) -> PathBuf {
        self.path("state/journal")
    }

    pub fn param_dir(&self) -> PathBuf {
        self.path("state/params")
    }

    /// Fake BatchConvert checkout with the three workflow files
    pub fn repo_dir(&self) -> PathBuf {
        self.touch("BatchConvert/batchconvert", "#!/usr/bin/env bash\n");
        self.touch("BatchConvert/pff2ometiff.nf", "workflow { }\n");
        self.touch("BatchConvert/pff2omezarr.nf", "workflow { }\n");
        self.path("BatchConvert")
    }

    /// Write params.json for a run converting `in_dir` into `out_dir`
    pub fn write_params(&self, in_dir: &Path, out_dir: &Path, extra: &[(&str, Value)]) {
        let mut params = Map::new();
        params.insert("output_type".to_string(), json!("ometiff"));
        params.insert("in_path".to_string(), json!(in_dir.to_str().unwrap()));
        params.insert("out_path".to_string(), json!(out_dir.to_str().unwrap()));
        params.insert("merge_files".to_string(), json!("False"));
        params.insert("compression".to_string(), json!("zlib"));
        for (key, value) in extra {
            params.insert(key.to_string(), value.clone());
        }
        write_json(&self.param_dir().join("params.json"), &Value::Object(params));
    }

    /// Write the default parameters BatchConvert ships with
    pub fn write_defaults(&self) {
        write_json(
            &self.param_dir().join("params.json.default"),
            &json!({
                "output_type": "ometiff",
                "in_path": "",
                "out_path": "",
                "merge_files": "False",
                "compression": "blosc",
                "keep_workdir": "False",
                "workdir": "/tmp"
            }),
        );
    }

    /// Original and converted image trees for a conversion
    pub fn images(&self, in_rel: &str, out_rel: &str) -> (PathBuf, PathBuf) {
        self.touch(&format!("{}/plate1/a.tif", in_rel), "raw-a");
        self.touch(&format!("{}/b.tif", in_rel), "raw-b");
        self.touch(&format!("{}/a.ome.tiff", out_rel), "converted-a");
        self.touch(&format!("{}/b.ome.tiff", out_rel), "converted-b");
        (self.path(in_rel), self.path(out_rel))
    }
}

pub fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// Relative paths of all files below `dir`, sorted
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    files.sort();
    files
}

/// Parsed ro-crate-metadata.json of a crate
pub fn read_metadata(crate_root: &Path) -> Value {
    let content = fs::read_to_string(crate_root.join("ro-crate-metadata.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

/// Find a graph entity by `@id`
pub fn entity<'a>(metadata: &'a Value, id: &str) -> Option<&'a Value> {
    metadata["@graph"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["@id"] == id)
}
