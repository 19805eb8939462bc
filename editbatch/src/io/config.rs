//! Batch configuration stored in `editbatch.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "editbatch.toml";

/// Batch configuration (TOML).
///
/// Missing fields default to the values in [`BatchConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BatchConfig {
    /// Command used to run a script; the script path is appended.
    pub interpreter: Vec<String>,

    /// Command used to run a test file; the test path is appended.
    pub test_command: Vec<String>,

    /// Edit agent executable.
    pub agent_command: String,

    /// Model passed to the edit agent when the manifest does not name one.
    pub model: Option<String>,

    /// Per-process wall-clock budget in seconds (scripts, tests, agent calls).
    pub timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            interpreter: vec!["python".to_string()],
            test_command: vec!["pytest".to_string()],
            agent_command: "aider".to_string(),
            model: None,
            timeout_secs: 10 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interpreter.is_empty() || self.interpreter[0].trim().is_empty() {
            return Err(anyhow!("interpreter must be a non-empty array"));
        }
        if self.test_command.is_empty() || self.test_command[0].trim().is_empty() {
            return Err(anyhow!("test_command must be a non-empty array"));
        }
        if self.agent_command.trim().is_empty() {
            return Err(anyhow!("agent_command must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `BatchConfig::default()`.
pub fn load_config(path: &Path) -> Result<BatchConfig> {
    if !path.exists() {
        let cfg = BatchConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BatchConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
