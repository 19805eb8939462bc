//! Batch AI code edits with recorded script and test runs.
//!
//! Reads a JSON batch manifest, applies per-directory instructions through the
//! configured edit agent, then runs and records the flagged scripts and tests.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use editbatch::execute::{ExecuteOptions, execute, validate_batch};
use editbatch::io::agent::{AiderAgent, openrouter_api_key};
use editbatch::io::config::{DEFAULT_CONFIG_PATH, load_config};
use editbatch::io::listing::list_files;
use editbatch::io::manifest::{load_manifest, write_json};
use editbatch::io::runner::CommandRunner;
use editbatch::{exit_codes, logging};

#[derive(Parser)]
#[command(
    name = "editbatch",
    version,
    about = "Batch AI code edits with recorded script and test runs"
)]
struct Cli {
    /// Path to the TOML config (defaults apply when missing).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log progress and failures to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a manifest, apply its instructions, run flagged scripts and tests,
    /// and print recorded outputs as JSON.
    Run {
        /// Batch manifest (JSON).
        manifest: PathBuf,
        /// Model for the edit agent; overrides the manifest and config.
        #[arg(long)]
        model: Option<String>,
        /// Also write outputs to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a manifest and print per-directory flags without side effects.
    Check {
        /// Batch manifest (JSON).
        manifest: PathBuf,
    },
    /// Print the names of all files under a directory, recursively.
    List { directory: PathBuf },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let code = match run(cli) {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::for_error(&err)
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            manifest,
            model,
            output,
        } => cmd_run(
            &cli.config,
            &manifest,
            model,
            output.as_deref(),
            cli.verbose,
        ),
        Command::Check { manifest } => cmd_check(&manifest),
        Command::List { directory } => cmd_list(&directory),
    }
}

fn cmd_run(
    config_path: &Path,
    manifest: &Path,
    model: Option<String>,
    output: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let cfg = load_config(config_path)?;
    let mut request = load_manifest(manifest)?;
    request.model = model.or(request.model).or_else(|| cfg.model.clone());

    let mut agent = AiderAgent::from_config(&cfg);
    if request.instructions.iter().any(|batch| !batch.is_empty()) {
        validate_batch(&request)?;
        agent = agent.with_api_key(openrouter_api_key()?);
    }
    let runner = CommandRunner::from_config(&cfg);

    let outputs = execute(&request, &agent, &runner, ExecuteOptions { verbose })?;
    if let Some(path) = output {
        write_json(path, &outputs)?;
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&outputs).context("serialize outputs")?
    );
    Ok(())
}

fn cmd_check(manifest: &Path) -> Result<()> {
    let request = load_manifest(manifest)?;
    let batch = validate_batch(&request)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&batch.flags).context("serialize flags")?
    );
    Ok(())
}

fn cmd_list(directory: &Path) -> Result<()> {
    for name in list_files(directory)? {
        println!("{name}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_with_overrides() {
        let cli = Cli::parse_from([
            "editbatch",
            "run",
            "batch.json",
            "--model",
            "openrouter/x",
            "-o",
            "out.json",
            "--verbose",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        match cli.command {
            Command::Run {
                manifest,
                model,
                output,
            } => {
                assert_eq!(manifest, PathBuf::from("batch.json"));
                assert_eq!(model.as_deref(), Some("openrouter/x"));
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parse_check_with_config() {
        let cli = Cli::parse_from(["editbatch", "--config", "alt.toml", "check", "batch.json"]);
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
        assert!(matches!(cli.command, Command::Check { .. }));
    }

    #[test]
    fn parse_list() {
        let cli = Cli::parse_from(["editbatch", "list", "src"]);
        assert!(matches!(
            cli.command,
            Command::List { directory } if directory == Path::new("src")
        ));
    }
}
