//! I/O collaborators for batch orchestration.

pub mod agent;
pub mod config;
pub mod listing;
pub mod manifest;
pub mod process;
pub mod runner;
