//! Error taxonomy for batch orchestration.
//!
//! Plumbing code returns `anyhow::Result` and attaches context; the variants
//! below are the classified failures callers are expected to branch on via
//! `err.downcast_ref::<BatchError>()`.

use std::path::PathBuf;

/// Classified batch failure.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Malformed shapes, type or length mismatches, bad flag specs, vacuous
    /// file lists, or file groups without a matching directory.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A directory or file handed to the edit agent does not exist.
    #[error("{kind} '{}' does not exist", path.display())]
    NotFound { kind: PathKind, path: PathBuf },

    /// A script or test process exited unsuccessfully.
    #[error("process `{command}` failed with exit code {code:?}: {stderr}")]
    Process {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Directory,
    File,
}

impl std::fmt::Display for PathKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathKind::Directory => f.write_str("Directory"),
            PathKind::File => f.write_str("File"),
        }
    }
}

impl BatchError {
    pub fn invalid(message: impl Into<String>) -> Self {
        BatchError::InvalidArgument(message.into())
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, BatchError::InvalidArgument(_))
    }
}

/// Return the classified error carried by `err`, if any.
pub fn classify(err: &anyhow::Error) -> Option<&BatchError> {
    err.chain().find_map(|cause| cause.downcast_ref::<BatchError>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn not_found_renders_kind_and_path() {
        let err = BatchError::NotFound {
            kind: PathKind::Directory,
            path: PathBuf::from("dir1"),
        };
        assert_eq!(err.to_string(), "Directory 'dir1' does not exist");
    }

    #[test]
    fn classify_sees_through_context() {
        let err = Err::<(), _>(BatchError::invalid("bad shape"))
            .context("validate batch")
            .unwrap_err();
        let classified = classify(&err).expect("classified");
        assert!(classified.is_invalid_argument());
    }
}
