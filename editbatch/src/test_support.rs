//! Test-only helpers: flag generation and recording collaborators.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use anyhow::Result;
use rand::Rng;
use serde_json::Value;

use crate::core::shape::groups_are_vacuous;
use crate::core::types::{RunOutput, leaf_count};
use crate::error::BatchError;
use crate::io::agent::EditAgent;
use crate::io::runner::{RunRecord, RunRequest, ScriptRunner};

/// How to fill a generated flag list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagSpec {
    /// Every flag has the given value.
    All(bool),
    /// Independent random draws.
    Mix,
}

impl FlagSpec {
    /// Accepts `true`, `false` or `"Mix"`.
    pub fn from_value(value: &Value) -> Result<Self, BatchError> {
        match value {
            Value::Bool(flag) => Ok(FlagSpec::All(*flag)),
            Value::String(mode) if mode == "Mix" => Ok(FlagSpec::Mix),
            other => Err(BatchError::invalid(format!(
                "Invalid value for record flag: {other}"
            ))),
        }
    }

    fn fill(self, count: usize, rng: &mut impl Rng) -> Vec<bool> {
        match self {
            FlagSpec::All(flag) => vec![flag; count],
            FlagSpec::Mix => (0..count).map(|_| rng.gen_bool(0.5)).collect(),
        }
    }
}

/// Flat flag lists sized to a file group and a test file group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedFlags {
    pub output_flags: Vec<bool>,
    pub test_output_flags: Vec<bool>,
    pub run_tests_flags: Vec<bool>,
}

/// Build flat flag lists for `file_groups` and `test_file_groups`.
///
/// Output flags get one entry per file; test output and run-tests flags get
/// one entry per test file.
pub fn generate_flag_lists(
    file_groups: &[Vec<String>],
    test_file_groups: &[Vec<String>],
    output_spec: FlagSpec,
    test_output_spec: FlagSpec,
    run_tests_spec: FlagSpec,
    rng: &mut impl Rng,
) -> Result<GeneratedFlags, BatchError> {
    if groups_are_vacuous(file_groups) || groups_are_vacuous(test_file_groups) {
        return Err(BatchError::invalid(
            "files_by_directory and test_file_names cannot be empty or contain empty lists",
        ));
    }
    let files = leaf_count(file_groups);
    let tests = leaf_count(test_file_groups);
    Ok(GeneratedFlags {
        output_flags: output_spec.fill(files, rng),
        test_output_flags: test_output_spec.fill(tests, rng),
        run_tests_flags: run_tests_spec.fill(tests, rng),
    })
}

/// Random vacuous structure: `[]`, or up to three levels of empty arrays.
pub fn generate_nested_vacuous_lists(rng: &mut impl Rng) -> Value {
    if rng.gen_bool(0.5) {
        return Value::Array(Vec::new());
    }
    let outer = rng.gen_range(0..=4);
    let mut levels = Vec::with_capacity(outer);
    for _ in 0..outer {
        let middle = rng.gen_range(0..=4);
        let mut sublists = Vec::with_capacity(middle);
        for _ in 0..middle {
            let inner = rng.gen_range(0..=4);
            sublists.push(Value::Array(vec![Value::Array(Vec::new()); inner]));
        }
        levels.push(Value::Array(sublists));
    }
    Value::Array(levels)
}

/// One captured [`EditAgent::apply_instructions`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCall {
    pub directory: PathBuf,
    pub file_names: Vec<String>,
    pub model: String,
    pub instructions: Vec<String>,
}

/// Agent that records calls and never touches the filesystem.
#[derive(Debug, Default)]
pub struct RecordingAgent {
    calls: RefCell<Vec<AgentCall>>,
}

impl RecordingAgent {
    pub fn calls(&self) -> Vec<AgentCall> {
        self.calls.borrow().clone()
    }
}

impl EditAgent for RecordingAgent {
    fn apply_instructions(
        &self,
        directory: &Path,
        file_names: &[String],
        model: &str,
        instructions: &[String],
    ) -> Result<()> {
        self.calls.borrow_mut().push(AgentCall {
            directory: directory.to_path_buf(),
            file_names: file_names.to_vec(),
            model: model.to_string(),
            instructions: instructions.to_vec(),
        });
        Ok(())
    }
}

/// Runner that echoes paths back as output without spawning processes.
///
/// Scripts produce `"Output from <path>"`; tests produce
/// `"Test output from <path>"` when recorded. A script or test whose file name
/// matches `fail_on` fails with [`BatchError::Process`].
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    fail_on: Option<String>,
    requests: RefCell<Vec<RunRequest>>,
}

impl ScriptedRunner {
    pub fn echo() -> Self {
        Self::default()
    }

    pub fn failing_on(file_name: &str) -> Self {
        Self {
            fail_on: Some(file_name.to_string()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<RunRequest> {
        self.requests.borrow().clone()
    }

    fn check(&self, path: &Path) -> Result<(), BatchError> {
        let failing = self
            .fail_on
            .as_deref()
            .is_some_and(|name| path.file_name().is_some_and(|file| file == name));
        if failing {
            return Err(BatchError::Process {
                command: format!("scripted {}", path.display()),
                code: Some(1),
                stderr: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

impl ScriptRunner for ScriptedRunner {
    fn run_and_record(&self, request: &RunRequest) -> Result<RunRecord> {
        self.requests.borrow_mut().push(request.clone());
        let mut record = RunRecord::default();

        if let Some(script) = &request.script_path {
            self.check(script)?;
            if request.record_output {
                record.script = RunOutput::new(format!("Output from {}", script.display()), "");
            }
        }

        if request.run_tests {
            for test in &request.test_file_paths {
                self.check(test)?;
                let output = if request.record_test_output {
                    RunOutput::new(format!("Test output from {}", test.display()), "")
                } else {
                    RunOutput::default()
                };
                record.tests.insert(test.clone(), output);
            }
        }
        Ok(record)
    }
}
