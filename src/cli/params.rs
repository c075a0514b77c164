// src/cli/params.rs
//! Parameter file editing commands

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ParamsCommands {
    /// Add or replace a parameter
    ///
    /// The value is stored verbatim as a string. A missing file is created
    /// from its .default document.
    Set {
        /// Parameter name
        key: String,

        /// Parameter value
        value: String,

        /// Parameter file (default: ~/.batchconvert/params/params.json)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Document to seed a missing file from (default: <file>.default)
        #[arg(long)]
        default_file: Option<PathBuf>,
    },

    /// Remove a parameter
    Delete {
        /// Parameter name
        key: String,

        /// Parameter file (default: ~/.batchconvert/params/params.json)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Document to seed a missing file from (default: <file>.default)
        #[arg(long)]
        default_file: Option<PathBuf>,
    },
}
