//! Script/test runner abstraction.
//!
//! The [`ScriptRunner`] trait decouples orchestration from how scripts and
//! tests are actually executed. Tests use scripted runners that return
//! predetermined outputs without spawning processes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::types::RunOutput;
use crate::io::config::BatchConfig;
use crate::io::process::{describe_command, run_captured, run_uncaptured};

/// Parameters for one runner invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    /// Script to execute, if any.
    pub script_path: Option<PathBuf>,
    /// Capture the script's stdout/stderr. The script runs either way.
    pub record_output: bool,
    /// Test files to execute when `run_tests` is set.
    pub test_file_paths: Vec<PathBuf>,
    /// Capture each test file's stdout/stderr.
    pub record_test_output: bool,
    /// Execute the test files at all.
    pub run_tests: bool,
}

/// Result of one runner invocation.
///
/// `script` is empty when nothing was recorded; `tests` is empty when tests
/// were not run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRecord {
    pub script: RunOutput,
    pub tests: BTreeMap<PathBuf, RunOutput>,
}

/// Abstraction over script/test execution backends.
pub trait ScriptRunner {
    /// Run the requested script and tests. Unsuccessful exits must surface as
    /// [`crate::error::BatchError::Process`].
    fn run_and_record(&self, request: &RunRequest) -> Result<RunRecord>;
}

/// Runner that spawns the configured interpreter and test command.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    interpreter: Vec<String>,
    test_command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandRunner {
    pub fn from_config(cfg: &BatchConfig) -> Self {
        Self {
            interpreter: cfg.interpreter.clone(),
            test_command: cfg.test_command.clone(),
            timeout: cfg.timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }

    fn run_one(&self, argv: &[String], path: &Path, record: bool) -> Result<RunOutput> {
        let cmd = build_command(argv, path);
        let label = describe_command(&cmd);
        if record {
            let output = run_captured(cmd, self.timeout, self.output_limit_bytes)?
                .ensure_success(&label)?;
            return Ok(RunOutput::new(output.stdout_lossy(), output.stderr_lossy()));
        }
        run_uncaptured(cmd, self.timeout)?.ensure_success(&label)?;
        Ok(RunOutput::default())
    }
}

impl ScriptRunner for CommandRunner {
    #[instrument(
        skip_all,
        fields(script = ?request.script_path, tests = request.test_file_paths.len())
    )]
    fn run_and_record(&self, request: &RunRequest) -> Result<RunRecord> {
        let mut record = RunRecord::default();

        if let Some(script) = &request.script_path {
            info!(script = %script.display(), record = request.record_output, "running script");
            record.script = self
                .run_one(&self.interpreter, script, request.record_output)
                .with_context(|| format!("run script {}", script.display()))?;
        }

        if request.run_tests {
            for test in &request.test_file_paths {
                info!(test = %test.display(), record = request.record_test_output, "running tests");
                // Tests are always captured so a failure can report their output.
                let captured = self
                    .run_one(&self.test_command, test, true)
                    .with_context(|| format!("run tests {}", test.display()))?;
                let kept = if request.record_test_output {
                    captured
                } else {
                    RunOutput::default()
                };
                record.tests.insert(test.clone(), kept);
            }
        } else if !request.test_file_paths.is_empty() {
            debug!("run_tests is false, skipping test files");
        }

        Ok(record)
    }
}

fn build_command(argv: &[String], path: &Path) -> Command {
    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..]).arg(path);
    cmd
}
