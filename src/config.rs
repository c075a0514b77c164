// src/config.rs

//! Run crate configuration
//!
//! Everything the crate maker needs is passed in explicitly. The optional
//! settings file overrides the descriptive metadata of the crate:
//!
//! ```toml
//! name = "Conversion of plate 3"
//! license = "https://creativecommons.org/licenses/by/4.0/"
//! workflow_url = "https://github.com/Euro-BioImaging/BatchConvert"
//!
//! [[authors]]
//! id = "https://orcid.org/0000-0001-9823-0581"
//! name = "Bugra Özdemir"
//! ```

use crate::error::{Error, Result};
use crate::params::ParamPaths;
use crate::reconcile::ReconcileConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Repository of the BatchConvert tool
pub const DEFAULT_WORKFLOW_URL: &str = "https://github.com/Euro-BioImaging/BatchConvert";

/// A crate author
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Author {
    /// Identifier, usually an ORCID URL
    pub id: String,
    pub name: String,
}

impl Author {
    /// The BatchConvert author
    pub fn batchconvert() -> Self {
        Self {
            id: "https://orcid.org/0000-0001-9823-0581".to_string(),
            name: "Bugra Özdemir".to_string(),
        }
    }
}

/// Descriptive crate metadata from the settings file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrateSettings {
    /// Root dataset name; derived from the input directory when unset
    #[serde(default)]
    pub name: Option<String>,

    /// Root dataset description; derived from the run when unset
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub license: Option<String>,

    #[serde(default = "default_workflow_url")]
    pub workflow_url: String,

    #[serde(default = "default_authors")]
    pub authors: Vec<Author>,
}

impl Default for CrateSettings {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            license: None,
            workflow_url: default_workflow_url(),
            authors: default_authors(),
        }
    }
}

fn default_workflow_url() -> String {
    DEFAULT_WORKFLOW_URL.to_string()
}

fn default_authors() -> Vec<Author> {
    vec![Author::batchconvert()]
}

impl CrateSettings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: CrateSettings =
            toml::from_str(content).map_err(|e| Error::ConfigError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.authors.iter().any(|a| a.id.trim().is_empty()) {
            return Err(Error::ConfigError("author id must not be empty".to_string()));
        }
        if self.workflow_url.trim().is_empty() {
            return Err(Error::ConfigError("workflow_url must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Everything needed to turn a finished conversion into a run crate
#[derive(Debug, Clone)]
pub struct RunCrateConfig {
    /// BatchConvert checkout holding `batchconvert` and the Nextflow files
    pub repo_dir: PathBuf,
    /// Directory with `params.json` and `params.json.default`
    pub param_dir: PathBuf,
    pub reconcile: ReconcileConfig,
    pub settings: CrateSettings,
}

impl RunCrateConfig {
    pub fn new(
        repo_dir: impl Into<PathBuf>,
        param_dir: impl Into<PathBuf>,
        journal_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            param_dir: param_dir.into(),
            reconcile: ReconcileConfig::new(journal_dir),
            settings: CrateSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: CrateSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Locations of the parameter documents
    pub fn param_paths(&self) -> ParamPaths {
        ParamPaths::in_dir(&self.param_dir)
    }
}
