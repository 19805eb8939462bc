//! JSON batch manifests and output files.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::execute::BatchRequest;

/// Load a batch request from a JSON manifest.
///
/// Only the envelope is typed here; file and flag lists are checked later by
/// [`crate::execute::validate_batch`].
pub fn load_manifest(path: &Path) -> Result<BatchRequest> {
    debug!(path = %path.display(), "loading manifest");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read manifest {}", path.display()))?;
    let request: BatchRequest = serde_json::from_str(&contents)
        .with_context(|| format!("parse manifest {}", path.display()))?;
    debug!(directories = request.directory_paths.len(), "manifest loaded");
    Ok(request)
}

/// Atomically write `value` as pretty JSON (temp file + rename).
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value).context("serialize json")?;
    buf.push('\n');
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, buf).with_context(|| format!("write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
