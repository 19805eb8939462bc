//! Edit agent abstraction for applying instructions to files.
//!
//! The [`EditAgent`] trait decouples orchestration from the coding agent
//! backend (currently the `aider` CLI). Tests use recording agents that never
//! spawn processes.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::error::{BatchError, PathKind};
use crate::io::config::BatchConfig;
use crate::io::process::{describe_command, run_captured};

/// Environment variable holding the OpenRouter API key.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Abstraction over code-editing agents.
pub trait EditAgent {
    /// Apply each instruction, in order, to `file_names` inside `directory`.
    ///
    /// Fails with [`BatchError::NotFound`] when the directory or a file is
    /// missing and with [`BatchError::InvalidArgument`] when `file_names` is
    /// empty.
    fn apply_instructions(
        &self,
        directory: &Path,
        file_names: &[String],
        model: &str,
        instructions: &[String],
    ) -> Result<()>;
}

/// Resolve `file_names` against `directory`, checking that everything exists.
pub fn resolve_edit_targets(directory: &Path, file_names: &[String]) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(BatchError::NotFound {
            kind: PathKind::Directory,
            path: directory.to_path_buf(),
        }
        .into());
    }
    if file_names.is_empty() {
        return Err(BatchError::invalid("No files provided to process.").into());
    }
    let mut paths = Vec::with_capacity(file_names.len());
    for name in file_names {
        let path = directory.join(name);
        if !path.is_file() {
            return Err(BatchError::NotFound {
                kind: PathKind::File,
                path,
            }
            .into());
        }
        paths.push(path);
    }
    Ok(paths)
}

/// Read the OpenRouter API key from the environment.
pub fn openrouter_api_key() -> Result<String> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(BatchError::invalid(format!(
            "{API_KEY_ENV} environment variable is not set"
        ))
        .into()),
    }
}

/// Agent that spawns the `aider` CLI once per instruction.
///
/// Git integration is disabled and confirmations are auto-accepted, so edits
/// land directly in the working tree.
#[derive(Debug, Clone)]
pub struct AiderAgent {
    program: String,
    timeout: Duration,
    output_limit_bytes: usize,
    api_key: Option<String>,
}

impl AiderAgent {
    pub fn from_config(cfg: &BatchConfig) -> Self {
        Self {
            program: cfg.agent_command.clone(),
            timeout: cfg.timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
            api_key: None,
        }
    }

    /// Pass `key` to the agent as [`API_KEY_ENV`].
    pub fn with_api_key(mut self, key: String) -> Self {
        self.api_key = Some(key);
        self
    }

    /// File names are passed as given; they resolve against `directory`, which
    /// becomes the agent's working directory.
    fn command(
        &self,
        directory: &Path,
        file_names: &[String],
        model: &str,
        instruction: &str,
    ) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--yes-always")
            .arg("--no-git")
            .arg("--no-auto-commits")
            .arg("--no-pretty")
            .arg("--model")
            .arg(model)
            .arg("--message")
            .arg(instruction)
            .args(file_names)
            .current_dir(directory);
        if let Some(key) = &self.api_key {
            cmd.env(API_KEY_ENV, key);
        }
        cmd
    }
}

impl EditAgent for AiderAgent {
    #[instrument(
        skip_all,
        fields(
            directory = %directory.display(),
            files = file_names.len(),
            instructions = instructions.len()
        )
    )]
    fn apply_instructions(
        &self,
        directory: &Path,
        file_names: &[String],
        model: &str,
        instructions: &[String],
    ) -> Result<()> {
        resolve_edit_targets(directory, file_names)?;
        for (index, instruction) in instructions.iter().enumerate() {
            info!(index, model, "applying instruction");
            let cmd = self.command(directory, file_names, model, instruction);
            let label = describe_command(&cmd);
            let output = run_captured(cmd, self.timeout, self.output_limit_bytes)
                .with_context(|| format!("run {}", self.program))?
                .ensure_success(&label)
                .with_context(|| format!("apply instruction {index} in {}", directory.display()))?;
            debug!(stdout_bytes = output.stdout.len(), "instruction applied");
        }
        Ok(())
    }
}
