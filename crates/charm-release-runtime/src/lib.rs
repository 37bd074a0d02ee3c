//! External tool layer for charm-release.
//!
//! This crate owns every subprocess the release pipeline spawns: the pluggable
//! `ToolRunner` trait with a system runner and a scripted mock runner, typed
//! wrappers around the `charmcraft` and `docker` command lines together with
//! the parsers that scrape their output, tool configuration, and prerequisite
//! checks.

pub mod charmcraft;
pub mod config;
pub mod docker;
pub mod mock;
pub mod prereq;
pub mod runner;

pub use charmcraft::Charmcraft;
pub use config::ToolConfig;
pub use docker::Docker;
pub use mock::MockRunner;
pub use prereq::{check_release_prereqs, format_missing, MissingPrereq};
pub use runner::{Invocation, SystemRunner, ToolOutput, ToolRunner};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tool '{0}' was not found on this system")]
    ToolUnavailable(String),
    #[error("failed to execute '{command}': {reason}")]
    ExecFailed { command: String, reason: String },
    #[error("tool config error: {0}")]
    Config(String),
}
