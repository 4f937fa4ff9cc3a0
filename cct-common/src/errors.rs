//! Error taxonomy for CCT.
//!
//! Two kinds are deliberately kept apart:
//!
//! - [`ScenarioError`] means "this scenario failed". It is raised by a
//!   lifecycle phase, caught by the orchestrator, reported through the task's
//!   error reporter, and converted into a [`Termination`]. It never reaches
//!   the process boundary raw.
//! - [`Termination`] is a control-flow outcome threaded back through the call
//!   chain to the process boundary. It is a plain value, not a panic or an
//!   unwind.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single fault-injection scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A precondition was unmet; nothing was mutated.
    #[error("precondition not met: {0}")]
    Precondition(String),

    /// An external command exited unsuccessfully.
    #[error("command `{cmd}` failed with status {status}: {stderr}")]
    Command {
        cmd: String,
        status: i32,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Observation ran out of time without seeing the expected reaction.
    #[error("timed out after {waited:?} waiting for {expectation}")]
    Timeout {
        waited: Duration,
        expectation: String,
    },

    /// The cluster reacted, but not in the expected way.
    #[error("unexpected cluster reaction: {0}")]
    Unexpected(String),

    /// The operator declined to proceed, or confirmation was unavailable.
    #[error("cancelled: {0}")]
    Cancelled(String),
}

/// Process-level termination signal.
///
/// Modeled as a distinguished result variant rather than an unwinding
/// mechanism, so in-flight scoped environment changes can still restore
/// state on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Help requested, or no scenario selector was given.
    HelpRequested,
    /// The run requires root and does not have it.
    InsufficientPrivilege,
    /// Setup failed before any scenario ran (directories, logging).
    Fatal,
    /// A scenario-level error was reported; the run aborts here.
    ScenarioFailed,
    /// An external interrupt ended the run.
    Interrupted,
}

impl Termination {
    /// Process exit status for this termination.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::HelpRequested => 0,
            Self::InsufficientPrivilege
            | Self::Fatal
            | Self::ScenarioFailed
            | Self::Interrupted => 1,
        }
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::HelpRequested => "help requested",
            Self::InsufficientPrivilege => "insufficient privilege",
            Self::Fatal => "fatal setup error",
            Self::ScenarioFailed => "scenario failed",
            Self::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_is_a_non_failure_exit() {
        assert_eq!(Termination::HelpRequested.exit_code(), 0);
    }

    #[test]
    fn test_failures_exit_nonzero() {
        for term in [
            Termination::InsufficientPrivilege,
            Termination::Fatal,
            Termination::ScenarioFailed,
            Termination::Interrupted,
        ] {
            assert_eq!(term.exit_code(), 1, "{term} should be a failure exit");
        }
    }

    #[test]
    fn test_timeout_message_names_the_expectation() {
        let err = ScenarioError::Timeout {
            waited: Duration::from_secs(60),
            expectation: "sbd to be restarted or the node fenced".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("60s"));
        assert!(msg.contains("sbd to be restarted"));
    }
}
