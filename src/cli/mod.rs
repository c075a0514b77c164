// src/cli/mod.rs
//! CLI definitions for batchconvert-rocrate
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! - `write` - Turn a finished conversion into a Workflow Run Crate
//! - `diff` - Show parameters that differ from the defaults
//! - `reconcile` - Reorganize input/output directories only
//! - `recover` - Finish or undo interrupted reconciliations
//! - `params` - Edit parameter files
//! - `completions` - Shell completion scripts

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

mod params;

pub use params::ParamsCommands;

#[derive(Parser)]
#[command(name = "batchconvert-rocrate")]
#[command(author = "BatchConvert Contributors")]
#[command(version)]
#[command(about = "Workflow Run RO-Crate provenance for BatchConvert conversions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a Workflow Run Crate for the last conversion
    ///
    /// Moves the input and output directories into a single crate root so
    /// that no image is stored twice, then writes ro-crate-metadata.json.
    Write {
        /// BatchConvert checkout holding batchconvert and the Nextflow files
        #[arg(short, long, default_value = ".")]
        repo_dir: PathBuf,

        /// Directory with params.json (default: ~/.batchconvert/params)
        #[arg(short, long)]
        param_dir: Option<PathBuf>,

        /// Directory for reconciliation journals (default: ~/.batchconvert/journal)
        #[arg(long)]
        journal_dir: Option<PathBuf>,

        /// TOML file with crate name, description, license and authors
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show parameters whose value differs from the default
    Diff {
        /// Directory with params.json (default: ~/.batchconvert/params)
        #[arg(short, long)]
        param_dir: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Reconcile an input and an output directory without writing a crate
    Reconcile {
        /// Directory of the original images
        in_dir: PathBuf,

        /// Directory of the converted images
        out_dir: PathBuf,

        /// Directory for reconciliation journals (default: ~/.batchconvert/journal)
        #[arg(long)]
        journal_dir: Option<PathBuf>,

        /// Show the planned moves without touching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Roll back or forward reconciliations interrupted by a crash
    Recover {
        /// Directory for reconciliation journals (default: ~/.batchconvert/journal)
        #[arg(long)]
        journal_dir: Option<PathBuf>,
    },

    /// Parameter file editing
    #[command(subcommand)]
    Params(ParamsCommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
