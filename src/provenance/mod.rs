// src/provenance/mod.rs

//! Workflow Run Crates for BatchConvert conversions
//!
//! After a conversion, the run's parameter documents are diffed against the
//! defaults, the input and output directories are reconciled into a single
//! crate root, and `ro-crate-metadata.json` is written there. The crate
//! records:
//!
//! - the BatchConvert workflow and its Nextflow sub-workflows
//! - the parameter documents of the run
//! - one FormalParameter / PropertyValue pair per customised parameter
//! - the original and converted image directories as datasets
//! - a `CreateAction` linking the workflow, its inputs and its result
//!
//! Everything that can fail before a directory is moved is checked first:
//! missing workflow files or parameters, undescribable parameter values,
//! parameter ids that clash with other entities, and data entities that would
//! overlap inside the crate.

mod parameters;
mod workflow;

pub use parameters::{
    additional_type, parameter_entities, parameter_id, value_id, FORMAL_PARAMETER_PROFILE,
};
pub use workflow::{
    validate_sources, workflow_crate, workflow_sources, MAIN_WORKFLOW, OMETIFF_WORKFLOW,
    OMEZARR_WORKFLOW,
};

use chrono::{DateTime, Local};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::RunCrateConfig;
use crate::error::{Error, Result};
use crate::params::{ParamDiff, ParameterDocument, IN_PATH_KEY, OUT_PATH_KEY};
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::rocrate::{dataset_dest, Entity, RoCrate, WriteSummary};

/// Identifier of the action describing the conversion
pub const RUN_ACTION_ID: &str = "#conversion-run";

/// Parameter holding the conversion format
const OUTPUT_TYPE_KEY: &str = "output_type";

/// Parameter telling BatchConvert to keep its work directory
const KEEP_WORKDIR_KEY: &str = "keep_workdir";

/// Parameter holding the work directory
const WORKDIR_KEY: &str = "workdir";

/// Nextflow log location inside the work directory
const NEXTFLOW_LOG: &str = "logs/.nextflow.log";

/// Crate locations of the parameter documents and the log
const PARAMS_DEST: &str = "params/params.json";
const DEFAULTS_DEST: &str = "params/params.json.default";
const LOG_DEST: &str = "logs/nextflow.log";

/// What writing a run crate did
#[derive(Debug, Clone)]
pub struct RunCrateReport {
    pub outcome: ReconcileOutcome,
    /// Customised parameters, `None` when the defaults were missing
    pub custom_params: Option<usize>,
    pub log_included: bool,
    pub summary: WriteSummary,
}

impl RunCrateReport {
    pub fn crate_root(&self) -> &Path {
        &self.outcome.crate_root
    }
}

/// Run-specific inputs gathered before anything on disk changes
struct RunInputs {
    params: ParameterDocument,
    diff: Option<ParamDiff>,
    in_dir: PathBuf,
    out_dir: PathBuf,
    log_file: Option<PathBuf>,
}

/// Builds the run crate of a finished conversion
pub struct RunCrateMaker {
    config: RunCrateConfig,
}

impl RunCrateMaker {
    /// Create a maker; the parameter directory must exist
    pub fn new(config: RunCrateConfig) -> Result<Self> {
        if !config.param_dir.is_dir() {
            return Err(Error::NotFound(config.param_dir.clone()));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &RunCrateConfig {
        &self.config
    }

    /// Reconcile the run's directories and write its crate
    pub fn write(&self) -> Result<RunCrateReport> {
        self.write_at(Local::now())
    }

    /// As [`RunCrateMaker::write`], with an explicit completion time
    pub fn write_at(&self, now: DateTime<Local>) -> Result<RunCrateReport> {
        let inputs = self.gather_inputs()?;
        validate_sources(&self.config.repo_dir)?;
        let (mut crate_, main_workflow) =
            workflow_crate(&self.config.repo_dir, &self.config.settings, now)?;
        if let Some(diff) = &inputs.diff {
            check_entity_ids(&crate_, diff)?;
        }

        let reconciler = Reconciler::new(self.config.reconcile.clone())?;
        let plan = reconciler.plan(&inputs.in_dir, &inputs.out_dir)?;
        check_destinations(&destinations(&inputs, &plan.outcome)?)?;

        let outcome = reconciler.reconcile_at(&inputs.in_dir, &inputs.out_dir, now)?;

        self.describe_run(&mut crate_, &main_workflow, &inputs, &outcome, now)?;

        let summary = crate_.write(&outcome.crate_root).inspect_err(|e| {
            warn!(
                "Directories were reconciled into {} but the crate could not be written: {}",
                outcome.crate_root.display(),
                e
            );
        })?;

        info!(
            "Run crate written to {} ({} files, {} bytes)",
            outcome.crate_root.display(),
            summary.files_copied,
            summary.total_bytes
        );

        Ok(RunCrateReport {
            custom_params: inputs.diff.as_ref().map(ParamDiff::len),
            log_included: inputs.log_file.is_some(),
            outcome,
            summary,
        })
    }

    /// Load and check everything the crate needs from the parameter documents
    fn gather_inputs(&self) -> Result<RunInputs> {
        let paths = self.config.param_paths();
        let params = ParameterDocument::load(&paths.params)?;
        let in_dir = params.require_path(IN_PATH_KEY)?;
        let out_dir = params.require_path(OUT_PATH_KEY)?;

        let diff = if paths.defaults.exists() {
            let defaults = ParameterDocument::load(&paths.defaults)?;
            let diff = ParamDiff::compute(&params, &defaults);
            for param in &diff.custom {
                additional_type(&param.key, &param.value)?;
            }
            debug!(
                "{} customised parameters, {} at their default",
                diff.len(),
                diff.unchanged
            );
            Some(diff)
        } else {
            warn!(
                "Could not find {}, customised parameters are not recorded",
                paths.defaults.display()
            );
            None
        };

        let log_file = if params.is_truthy(KEEP_WORKDIR_KEY) {
            match params.get_str(WORKDIR_KEY) {
                Some(workdir) => {
                    let log = Path::new(workdir).join(NEXTFLOW_LOG);
                    if log.is_file() {
                        Some(log)
                    } else {
                        warn!("Could not find Nextflow log {}", log.display());
                        None
                    }
                }
                None => {
                    warn!("{} is set but {} is missing", KEEP_WORKDIR_KEY, WORKDIR_KEY);
                    None
                }
            }
        } else {
            None
        };

        Ok(RunInputs {
            params,
            diff,
            in_dir,
            out_dir,
            log_file,
        })
    }

    /// Add the run-specific entities to the workflow crate
    fn describe_run(
        &self,
        crate_: &mut RoCrate,
        main_workflow: &Value,
        inputs: &RunInputs,
        outcome: &ReconcileOutcome,
        now: DateTime<Local>,
    ) -> Result<()> {
        let paths = self.config.param_paths();
        crate_
            .add_file(&paths.params, PARAMS_DEST, &[])?
            .set("name", "parameters")
            .set("encodingFormat", "text/json");

        let image_dataset = crate_
            .add_directory(
                &outcome.image_dir,
                dataset_dest(&outcome.crate_root, &outcome.image_dir)?,
            )?
            .set("name", "original_image_directory")
            .set("description", "Directory of images to convert")
            .reference();
        let converted_dataset = crate_
            .add_directory(
                &outcome.converted_image_dir,
                dataset_dest(&outcome.crate_root, &outcome.converted_image_dir)?,
            )?
            .set("name", "converted_image_directory")
            .set("description", "Directory with converted images")
            .reference();

        let mut objects = vec![image_dataset];
        if let Some(diff) = &inputs.diff {
            crate_
                .add_file(&paths.defaults, DEFAULTS_DEST, &[])?
                .set("name", "default_parameters")
                .set("encodingFormat", "text/json");

            let mut input_refs = Vec::new();
            for param in &diff.custom {
                let (formal, value) = parameter_entities(param)?;
                input_refs.push(crate_.add(formal));
                objects.push(crate_.add(value));
            }

            let main_id = main_workflow["@id"].as_str().unwrap_or(MAIN_WORKFLOW);
            if let Some(main) = crate_.get_mut(main_id) {
                for input in input_refs {
                    main.append_to("input", input);
                }
            }
        }

        if let Some(log_file) = &inputs.log_file {
            crate_
                .add_file(log_file, LOG_DEST, &[])?
                .set("name", "Nextflow log")
                .set("encodingFormat", "text/plain");
        }

        let src_name = inputs
            .in_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let action = Entity::new(RUN_ACTION_ID, &["CreateAction"])
            .with("name", format!("BatchConvert conversion of '{}'", src_name))
            .with("instrument", main_workflow.clone())
            .with("object", Value::Array(objects))
            .with("result", Value::Array(vec![converted_dataset]))
            .with("endTime", now.to_rfc3339());
        let action = crate_.add(action);

        let settings = &self.config.settings;
        let name = settings
            .name
            .clone()
            .unwrap_or_else(|| default_name(&src_name));
        let description = settings.description.clone().or_else(|| {
            inputs
                .params
                .get_str(OUTPUT_TYPE_KEY)
                .map(|output_type| default_description(&src_name, output_type))
        });

        let root = crate_.root_dataset_mut();
        root.set("name", name);
        if let Some(description) = description {
            root.set("description", description);
        }
        if let Some(license) = &settings.license {
            root.set("license", license.as_str());
        }
        root.append_to("mentions", action);

        Ok(())
    }
}

/// Every location a data entity of the run crate will occupy
fn destinations(inputs: &RunInputs, outcome: &ReconcileOutcome) -> Result<Vec<PathBuf>> {
    let mut dests: Vec<PathBuf> = [
        MAIN_WORKFLOW,
        OMETIFF_WORKFLOW,
        OMEZARR_WORKFLOW,
        PARAMS_DEST,
    ]
    .iter()
    .map(PathBuf::from)
    .collect();
    if inputs.diff.is_some() {
        dests.push(PathBuf::from(DEFAULTS_DEST));
    }
    if inputs.log_file.is_some() {
        dests.push(PathBuf::from(LOG_DEST));
    }
    dests.push(dataset_dest(&outcome.crate_root, &outcome.image_dir)?);
    dests.push(dataset_dest(&outcome.crate_root, &outcome.converted_image_dir)?);
    Ok(dests)
}

/// Fail if two data entities would share a location or one would land inside another
fn check_destinations(dests: &[PathBuf]) -> Result<()> {
    for (i, a) in dests.iter().enumerate() {
        for b in &dests[i + 1..] {
            if a.starts_with(b) || b.starts_with(a) {
                return Err(Error::InvalidPath(format!(
                    "{} and {} would overlap inside the crate",
                    a.display(),
                    b.display()
                )));
            }
        }
    }
    Ok(())
}

/// Fail if a parameter entity would replace another entity of the crate
fn check_entity_ids(crate_: &RoCrate, diff: &ParamDiff) -> Result<()> {
    let mut taken: HashSet<String> = crate_
        .entities()
        .iter()
        .map(|e| e.id().to_string())
        .collect();
    taken.insert(RUN_ACTION_ID.to_string());

    for param in &diff.custom {
        for id in [parameter_id(&param.key), value_id(&param.key)] {
            if !taken.insert(id.clone()) {
                return Err(Error::EntityCollision {
                    key: param.key.clone(),
                    id,
                });
            }
        }
    }
    Ok(())
}

/// Root dataset name used when none is configured
pub fn default_name(src_name: &str) -> String {
    format!("BatchConvert wf runcrate - converted directory '{}'", src_name)
}

/// Root dataset description used when none is configured
pub fn default_description(src_name: &str, output_type: &str) -> String {
    format!(
        "Workflow run crate describing conversion of images in directory '{}' to format {} using BatchConvert",
        src_name, output_type
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name_and_description() {
        assert_eq!(
            default_name("src"),
            "BatchConvert wf runcrate - converted directory 'src'"
        );
        assert_eq!(
            default_description("src", "omezarr"),
            "Workflow run crate describing conversion of images in directory 'src' to format omezarr using BatchConvert"
        );
    }

    #[test]
    fn test_check_destinations() {
        let dests = |names: &[&str]| names.iter().map(PathBuf::from).collect::<Vec<_>>();

        check_destinations(&dests(&["batchconvert", "params/params.json", "src", "src2"])).unwrap();
        check_destinations(&dests(&["params/params.json", "params/conv"])).unwrap();

        for overlapping in [
            ["params/params.json", "params"],
            ["src", "src"],
            ["converted_images", "converted_images/a"],
        ] {
            let err = check_destinations(&dests(&overlapping)).unwrap_err();
            assert!(matches!(err, Error::InvalidPath(_)));
        }
    }

    #[test]
    fn test_check_entity_ids() {
        use crate::params::ParameterDocument;

        let (crate_, _) = workflow_crate(
            Path::new("/opt/BatchConvert"),
            &crate::config::CrateSettings::default(),
            Local::now(),
        )
        .unwrap();
        let diff = |json: &str| {
            ParamDiff::compute(
                &ParameterDocument::from_json_str(json).unwrap(),
                &ParameterDocument::default(),
            )
        };

        check_entity_ids(&crate_, &diff(r#"{"compression": "zlib"}"#)).unwrap();

        let err = check_entity_ids(&crate_, &diff(r#"{"bash": "x"}"#)).unwrap_err();
        assert!(matches!(err, Error::EntityCollision { ref id, .. } if id == "#bash"));

        let err = check_entity_ids(&crate_, &diff(r#"{"conversion-run": 1}"#)).unwrap_err();
        assert!(matches!(err, Error::EntityCollision { ref id, .. } if id == RUN_ACTION_ID));

        // "#a" and "a" describe the same entity
        let err = check_entity_ids(&crate_, &diff(r##"{"a": 1, "#a": 2}"##)).unwrap_err();
        assert!(matches!(err, Error::EntityCollision { ref key, .. } if key == "#a"));
    }

    #[test]
    fn test_missing_param_dir() {
        let config = RunCrateConfig::new("/opt/BatchConvert", "/nonexistent/params", "/tmp/j");
        assert!(matches!(
            RunCrateMaker::new(config),
            Err(Error::NotFound(_))
        ));
    }
}
