//! Query-driven Python code modification tool.
//!
//! `mender run` plans a modification query against a codebase, applies it
//! task by task, and drives each change through generated tests in an
//! isolated interpreter until the tests pass or the repair rounds run out.
//! `mender exec` runs a single snippet in the same sandbox for inspection.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mender::io::codebase::load_codebase;
use mender::io::config::{self, MenderConfig};
use mender::io::report::store_report;
use mender::io::sandbox::Sandbox;
use mender::model::CliModel;
use mender::{exit_codes, logging, pipeline};

#[derive(Parser)]
#[command(
    name = "mender",
    version,
    about = "Query-driven code modification with sandboxed test repair"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan and apply a modification query against a codebase.
    Run {
        /// The modification request, in plain language.
        query: String,
        /// Directory holding the Python codebase.
        #[arg(long, default_value = ".")]
        codebase: PathBuf,
        /// Config file; a missing file means defaults.
        #[arg(long, default_value = "mender.toml")]
        config: PathBuf,
        /// Where to store the report; overrides the configured directory.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Execute one snippet in the sandbox and print its output.
    Exec {
        /// Path to the snippet file.
        snippet: PathBuf,
        /// Directory holding the Python codebase.
        #[arg(long, default_value = ".")]
        codebase: PathBuf,
        /// Config file; a missing file means defaults.
        #[arg(long, default_value = "mender.toml")]
        config: PathBuf,
    },
    /// Write a default config file.
    InitConfig {
        #[arg(long, default_value = "mender.toml")]
        path: PathBuf,
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            query,
            codebase,
            config,
            output,
        } => cmd_run(&query, &codebase, &config, output.as_deref()),
        Command::Exec {
            snippet,
            codebase,
            config,
        } => cmd_exec(&snippet, &codebase, &config),
        Command::InitConfig { path, force } => cmd_init_config(&path, force),
    }
}

fn cmd_run(
    query: &str,
    codebase_dir: &Path,
    config_path: &Path,
    output: Option<&Path>,
) -> Result<i32> {
    let mut config = config::load_config(config_path)?;
    if let Some(dir) = output {
        config.output.directory = dir.to_string_lossy().into_owned();
        config.validate()?;
    }

    let codebase = load_codebase(codebase_dir)?;
    let model = CliModel::new(config.model.clone());
    let sandbox = Sandbox::new(config.sandbox.clone());

    let report = pipeline::process_query(&model, &sandbox, &config, query, &codebase)?;
    store_report(Path::new(&config.output.directory), &report)?;

    for task in &report.task_reports {
        println!("{}: {}", task.task_id, task.output);
    }
    println!(
        "Results stored in the '{}' directory",
        config.output.directory
    );

    Ok(if report.all_green() {
        exit_codes::OK
    } else {
        exit_codes::FAILING
    })
}

fn cmd_exec(snippet_path: &Path, codebase_dir: &Path, config_path: &Path) -> Result<i32> {
    let config = config::load_config(config_path)?;
    let snippet = fs::read_to_string(snippet_path)
        .with_context(|| format!("read {}", snippet_path.display()))?;
    let codebase = load_codebase(codebase_dir)?;

    let result = Sandbox::new(config.sandbox).run(&snippet, &codebase);
    print!("{}", result.output);
    if !result.output.ends_with('\n') {
        println!();
    }
    if !result.stand_ins_used.is_empty() {
        let names: Vec<&str> = result.stand_ins_used.iter().map(String::as_str).collect();
        eprintln!("stand-ins used: {}", names.join(", "));
    }

    Ok(if result.success {
        exit_codes::OK
    } else {
        exit_codes::FAILING
    })
}

fn cmd_init_config(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        println!("{} already exists, use --force to overwrite", path.display());
        return Ok(exit_codes::OK);
    }
    config::write_config(path, &MenderConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_with_defaults() {
        let cli = Cli::parse_from(["mender", "run", "add a subtract function"]);
        match cli.command {
            Command::Run {
                query,
                codebase,
                config,
                output,
            } => {
                assert_eq!(query, "add a subtract function");
                assert_eq!(codebase, PathBuf::from("."));
                assert_eq!(config, PathBuf::from("mender.toml"));
                assert!(output.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parse_exec_with_codebase() {
        let cli = Cli::parse_from(["mender", "exec", "snippet.py", "--codebase", "proj"]);
        match cli.command {
            Command::Exec {
                snippet, codebase, ..
            } => {
                assert_eq!(snippet, PathBuf::from("snippet.py"));
                assert_eq!(codebase, PathBuf::from("proj"));
            }
            _ => panic!("expected exec"),
        }
    }

    #[test]
    fn parse_init_config_force() {
        let cli = Cli::parse_from(["mender", "init-config", "--force"]);
        assert!(matches!(
            cli.command,
            Command::InitConfig { force: true, .. }
        ));
    }

    #[test]
    fn init_config_writes_and_respects_existing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("mender.toml");

        cmd_init_config(&path, false).expect("write");
        let first = fs::read_to_string(&path).expect("read");

        fs::write(&path, "max_repair_rounds = 5\n").expect("overwrite");
        cmd_init_config(&path, false).expect("skip");
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "max_repair_rounds = 5\n"
        );

        cmd_init_config(&path, true).expect("force");
        assert_eq!(fs::read_to_string(&path).expect("read"), first);
    }
}
