// src/main.rs

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands, ParamsCommands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Write {
            repo_dir,
            param_dir,
            journal_dir,
            config,
        } => commands::cmd_write(repo_dir, param_dir, journal_dir, config),
        Commands::Diff { param_dir, json } => commands::cmd_diff(param_dir, json),
        Commands::Reconcile {
            in_dir,
            out_dir,
            journal_dir,
            dry_run,
        } => commands::cmd_reconcile(in_dir, out_dir, journal_dir, dry_run),
        Commands::Recover { journal_dir } => commands::cmd_recover(journal_dir),
        Commands::Params(ParamsCommands::Set {
            key,
            value,
            file,
            default_file,
        }) => commands::cmd_params_set(&key, &value, file, default_file),
        Commands::Params(ParamsCommands::Delete {
            key,
            file,
            default_file,
        }) => commands::cmd_params_delete(&key, file, default_file),
        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
