// src/lib.rs

//! BatchConvert Workflow Run Crates
//!
//! Provenance for image conversions run with BatchConvert, recorded as
//! RO-Crates that conform to the Workflow Run Crate profile.
//!
//! # Architecture
//!
//! - Parameter diff: customised values are recovered by comparing the run's
//!   `params.json` with `params.json.default`
//! - Reconciliation: input and output directories are moved under a single
//!   crate root so no image is stored twice, journaled for crash recovery
//! - Crate assembly: a JSON-LD graph describing the workflow, the parameter
//!   values and the datasets is written as `ro-crate-metadata.json`

pub mod config;
mod error;
pub mod filesystem;
pub mod params;
pub mod provenance;
pub mod reconcile;
pub mod rocrate;

pub use config::{Author, CrateSettings, RunCrateConfig};
pub use error::{Error, Result};
pub use params::{compute_custom_params, ParamDiff, ParamValue, ParameterDocument};
pub use provenance::{RunCrateMaker, RunCrateReport};
pub use reconcile::{
    classify, ReconcileConfig, ReconcileOutcome, Reconciler, RecoveryOutcome, Topology,
};
pub use rocrate::{Entity, RoCrate};
