// src/provenance/workflow.rs

//! The static part of a BatchConvert run crate
//!
//! Languages, the `batchconvert` entry point with its two Nextflow
//! sub-workflows, the authors, and the profiles the root dataset conforms to.
//! None of it depends on the run being described.

use chrono::{DateTime, Local};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::config::CrateSettings;
use crate::error::{Error, Result};
use crate::rocrate::{reference, Entity, RoCrate, WORKFLOW_CRATE_PROFILE};

/// Entry point script of BatchConvert
pub const MAIN_WORKFLOW: &str = "batchconvert";

/// Nextflow workflow run for `ometiff` output
pub const OMETIFF_WORKFLOW: &str = "pff2ometiff.nf";

/// Nextflow workflow run for `omezarr` output
pub const OMEZARR_WORKFLOW: &str = "pff2omezarr.nf";

const BASH_URL: &str = "https://www.gnu.org/software/bash/";
const NEXTFLOW_URL: &str = "https://www.nextflow.io/";

const PROCESS_RUN_PROFILE: &str = "https://w3id.org/ro/wfrun/process/0.1";
const WORKFLOW_RUN_PROFILE: &str = "https://w3id.org/ro/wfrun/workflow/0.1";

/// Workflow files a run crate is built from, relative to the BatchConvert checkout
pub fn workflow_sources(repo_dir: &Path) -> [PathBuf; 3] {
    [
        repo_dir.join(MAIN_WORKFLOW),
        repo_dir.join(OMETIFF_WORKFLOW),
        repo_dir.join(OMEZARR_WORKFLOW),
    ]
}

/// Fail unless every workflow file exists
pub fn validate_sources(repo_dir: &Path) -> Result<()> {
    for source in workflow_sources(repo_dir) {
        if !source.is_file() {
            return Err(Error::NotFound(source));
        }
    }
    Ok(())
}

fn language(id: &str, name: &str, url: &str) -> Entity {
    Entity::new(id, &["ComputerLanguage"])
        .with("name", name)
        .with("identifier", reference(url))
        .with("url", reference(url))
}

fn profile(id: &str, name: &str, version: &str) -> Entity {
    Entity::new(id, &["CreativeWork"])
        .with("name", name)
        .with("version", version)
}

fn sub_workflow_description(output_type: &str) -> String {
    format!(
        "Nextflow workflow executed when passing the argument (i.e converting to) '{}' as first argument to the BatchConvert utility.",
        output_type
    )
}

/// Build the workflow description shared by every run crate
///
/// Returns the crate and a reference to the main workflow.
pub fn workflow_crate(
    repo_dir: &Path,
    settings: &CrateSettings,
    published: DateTime<Local>,
) -> Result<(RoCrate, Value)> {
    let mut crate_ = RoCrate::published_at(published);

    let bash = crate_.add(language("#bash", "Bash", BASH_URL));
    let nextflow = crate_.add(language("#nextflow", "Nextflow", NEXTFLOW_URL));

    let [main_source, tiff_source, zarr_source] = workflow_sources(repo_dir);
    let main = crate_.add_workflow(main_source, MAIN_WORKFLOW, true, bash)?;

    let mut parts = Vec::new();
    for (source, dest, output_type) in [
        (tiff_source, OMETIFF_WORKFLOW, "ometiff"),
        (zarr_source, OMEZARR_WORKFLOW, "omezarr"),
    ] {
        let workflow = crate_.add_workflow(source, dest, false, nextflow.clone())?;
        if let Some(entity) = crate_.get_mut(dest) {
            entity.set("description", sub_workflow_description(output_type));
        }
        parts.push(workflow);
    }

    if let Some(entity) = crate_.get_mut(MAIN_WORKFLOW) {
        entity.set("hasPart", Value::Array(parts));
        entity.set("url", json!([settings.workflow_url]));
    }

    let authors: Vec<Value> = settings
        .authors
        .iter()
        .map(|author| {
            crate_.add(Entity::new(author.id.as_str(), &["Person"]).with("name", author.name.as_str()))
        })
        .collect();

    let profiles = vec![
        crate_.add(profile(PROCESS_RUN_PROFILE, "Process Run Crate", "0.1")),
        crate_.add(profile(WORKFLOW_RUN_PROFILE, "Workflow Run Crate", "0.1")),
        crate_.add(profile(WORKFLOW_CRATE_PROFILE, "Workflow RO-Crate", "1.0")),
    ];

    let root = crate_.root_dataset_mut();
    root.set("author", Value::Array(authors));
    root.set("conformsTo", Value::Array(profiles));

    Ok((crate_, main))
}
