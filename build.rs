// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: parameter directory
fn param_dir_arg() -> Arg {
    Arg::new("param_dir")
        .short('p')
        .long("param-dir")
        .value_name("DIR")
        .help("Directory with params.json (default: ~/.batchconvert/params)")
}

/// Common argument: journal directory
fn journal_dir_arg() -> Arg {
    Arg::new("journal_dir")
        .long("journal-dir")
        .value_name("DIR")
        .help("Directory for reconciliation journals (default: ~/.batchconvert/journal)")
}

fn param_file_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("file")
            .short('f')
            .long("file")
            .value_name("PATH")
            .help("Parameter file (default: ~/.batchconvert/params/params.json)"),
    )
    .arg(
        Arg::new("default_file")
            .long("default-file")
            .value_name("PATH")
            .help("Document to seed a missing file from (default: <file>.default)"),
    )
}

fn build_cli() -> Command {
    Command::new("batchconvert-rocrate")
        .version(env!("CARGO_PKG_VERSION"))
        .author("BatchConvert Contributors")
        .about("Workflow Run RO-Crate provenance for BatchConvert conversions")
        .subcommand_required(true)
        .subcommand(
            Command::new("write")
                .about("Write a Workflow Run Crate for the last conversion")
                .arg(
                    Arg::new("repo_dir")
                        .short('r')
                        .long("repo-dir")
                        .default_value(".")
                        .help("BatchConvert checkout holding batchconvert and the Nextflow files"),
                )
                .arg(param_dir_arg())
                .arg(journal_dir_arg())
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("PATH")
                        .help("TOML file with crate name, description, license and authors"),
                ),
        )
        .subcommand(
            Command::new("diff")
                .about("Show parameters whose value differs from the default")
                .arg(param_dir_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print JSON instead of text"),
                ),
        )
        .subcommand(
            Command::new("reconcile")
                .about("Reconcile an input and an output directory without writing a crate")
                .arg(Arg::new("in_dir").required(true).help("Directory of the original images"))
                .arg(Arg::new("out_dir").required(true).help("Directory of the converted images"))
                .arg(journal_dir_arg())
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Show the planned moves without touching anything"),
                ),
        )
        .subcommand(
            Command::new("recover")
                .about("Roll back or forward reconciliations interrupted by a crash")
                .arg(journal_dir_arg()),
        )
        .subcommand(
            Command::new("params")
                .about("Parameter file editing")
                .subcommand_required(true)
                .subcommand(param_file_args(
                    Command::new("set")
                        .about("Add or replace a parameter")
                        .arg(Arg::new("key").required(true).help("Parameter name"))
                        .arg(Arg::new("value").required(true).help("Parameter value")),
                ))
                .subcommand(param_file_args(
                    Command::new("delete")
                        .about("Remove a parameter")
                        .arg(Arg::new("key").required(true).help("Parameter name")),
                )),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("batchconvert-rocrate.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
