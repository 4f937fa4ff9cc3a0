//! Shared types and utilities for Cluster Crash Test.
//!
//! This crate holds the leaf pieces the `cct` binary is built on: the
//! scenario/phase vocabulary, the error taxonomy, derived artifact paths,
//! the JSON results sink, and thin shell helpers.

pub mod errors;
pub mod paths;
pub mod results;
pub mod shell;
pub mod types;

pub use errors::{ScenarioError, Termination};
pub use paths::RunPaths;
pub use results::ResultsSink;
pub use shell::CmdOutput;
pub use types::{CaseOutcome, CaseResult, ClusterDaemon, ScenarioKind, TaskPhase};
