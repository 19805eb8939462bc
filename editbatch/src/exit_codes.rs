//! Stable exit codes for editbatch CLI commands.

use crate::error::{BatchError, classify};

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid arguments, missing paths, or unreadable config/manifest.
pub const INVALID: i32 = 1;
/// A script, test, or agent process failed or timed out.
pub const PROCESS: i32 = 2;

/// Exit code for a failed command.
pub fn for_error(err: &anyhow::Error) -> i32 {
    match classify(err) {
        Some(BatchError::Process { .. }) => PROCESS,
        _ => INVALID,
    }
}
