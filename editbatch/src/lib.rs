//! Batch AI-assisted code editing with optional script and test runs.
//!
//! A batch names a list of directories, the files to edit in each, and flat
//! per-file flags saying which scripts and tests to run and record. The crate
//! is split into:
//!
//! - **[`core`]**: Pure structural checks on untyped nested lists and the
//!   redistribution of flat flags into per-directory groups. No I/O.
//! - **[`io`]**: Side-effecting collaborators (edit agent, script runner,
//!   directory listing, config and manifest files). Behind traits where the
//!   orchestrator depends on them, so tests can substitute fakes.
//!
//! [`execute`] ties the two together for the CLI.

pub mod core;
pub mod error;
pub mod execute;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
