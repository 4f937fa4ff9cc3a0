//! Task lifecycle protocol.
//!
//! Every scenario follows the same five ordered operations:
//! `pre_check → print_header → enable_report → run → wait`. The generic
//! [`drive`] function is the only place that sequences them, and it consumes
//! the task, so a task cannot be run twice. Only `run` mutates external
//! state; `wait` is bounded polling and a timeout there is a failed outcome,
//! never a crash.

pub mod fence;
pub mod kill;
pub mod split_brain;

use cct_common::{ScenarioError, ScenarioKind, TaskPhase};
use tracing::error;

/// One fault-injection scenario's unit of work.
pub trait Task {
    fn kind(&self) -> ScenarioKind;

    /// One-line description of what is about to happen.
    fn describe(&self) -> String;

    /// Validate that the scenario is applicable. Never mutates external
    /// state.
    async fn pre_check(&mut self) -> Result<(), ScenarioError>;

    /// Announce the scenario and, for mutating scenarios, confirm with the
    /// operator unless force is set. Console/log output only.
    fn print_header(&self) -> Result<(), ScenarioError>;

    /// Arm post-mortem artifact capture. Scenarios without a report keep
    /// this a no-op.
    async fn enable_report(&mut self) -> Result<(), ScenarioError>;

    /// Inject the fault. The single externally mutating phase; never retried
    /// internally.
    async fn run(&mut self) -> Result<(), ScenarioError>;

    /// Observe the cluster's reaction with bounded polling and classify it.
    /// Returns the classification message on the expected reaction.
    async fn wait(&mut self) -> Result<String, ScenarioError>;

    /// Error reporter: surfaces a scenario failure for the operator.
    fn error(&self, message: &str) {
        error!(scenario = %self.kind(), "{message}");
    }
}

/// Drive a task through its lifecycle, short-circuiting on the first
/// failure.
///
/// Returns the task in its terminal state, the furthest phase reached, and
/// the outcome. The phase stops at the state attained before the failing
/// operation, so a result can report how far the scenario got.
pub async fn drive<T: Task>(mut task: T) -> (T, TaskPhase, Result<String, ScenarioError>) {
    let mut phase = TaskPhase::Created;
    let result = async {
        task.pre_check().await?;
        phase = TaskPhase::Prechecked;
        task.print_header()?;
        task.enable_report().await?;
        phase = TaskPhase::ReportEnabled;
        phase = TaskPhase::Running;
        task.run().await?;
        phase = TaskPhase::Observing;
        let message = task.wait().await?;
        phase = TaskPhase::Succeeded;
        Ok(message)
    }
    .await;
    (task, phase, result)
}

/// Ask the operator to proceed. Force mode skips the prompt entirely; with
/// no interactive terminal and no force flag the scenario is cancelled
/// rather than run unconfirmed.
pub(crate) fn confirm_or_cancel(force: bool, prompt: &str) -> Result<(), ScenarioError> {
    if force {
        return Ok(());
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| ScenarioError::Cancelled(format!("confirmation unavailable: {e}")))?;
    if confirmed {
        Ok(())
    } else {
        Err(ScenarioError::Cancelled("declined by operator".into()))
    }
}
