//! Shared deterministic types for batch core logic.
//!
//! These types define stable contracts between core components and the
//! orchestrator. They do not depend on external state or I/O.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// File names per directory, parallel-indexed to the directory list.
pub type FileGroups = Vec<Vec<String>>;

/// Boolean flags reshaped to mirror a [`FileGroups`] structure.
pub type NestedFlags = Vec<Vec<bool>>;

/// Per-directory flag groups produced by `organize_flags`.
///
/// Each field is `None` when the corresponding file group was not supplied,
/// otherwise it has exactly the shape of that group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizedFlags {
    pub record_output_flag: Option<NestedFlags>,
    pub run_tests_flag: Option<NestedFlags>,
    pub record_test_output_values: Option<NestedFlags>,
}

/// Captured console output of one script or test run.
///
/// Both fields are empty when the run was not recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Outputs of one orchestration call keyed by `"<directory>-<file>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutputs {
    pub script_outputs: BTreeMap<String, RunOutput>,
    pub test_outputs: BTreeMap<String, RunOutput>,
}

/// Stable composite key for an output entry.
pub fn output_key(directory: &str, file: &str) -> String {
    format!("{directory}-{file}")
}

/// Total number of leaves across all groups.
pub fn leaf_count<T>(groups: &[Vec<T>]) -> usize {
    groups.iter().map(Vec::len).sum()
}
