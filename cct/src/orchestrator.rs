//! Scenario selection and dispatch.
//!
//! The three entry points are invoked unconditionally, in priority order
//! (kill family, fence, split brain); each one recognizes it has nothing to
//! do and returns immediately. At most one task is ever instantiated per
//! run, and a scenario failure aborts the run; a second scenario is never
//! attempted.

use crate::context::RunContext;
use crate::host::ClusterHost;
use crate::task::fence::FenceNode;
use crate::task::kill::KillDaemon;
use crate::task::split_brain::SplitBrain;
use crate::task::{Task, drive};
use cct_common::{
    CaseResult, ClusterDaemon, ScenarioError, ScenarioKind, TaskPhase, Termination,
};
use tracing::{info, warn};

/// Kill-family entry point.
pub async fn kill_process<H: ClusterHost>(
    ctx: &mut RunContext,
    host: &H,
) -> Result<(), Termination> {
    let Some(daemon) = ctx.scenario.and_then(ScenarioKind::daemon) else {
        return Ok(());
    };

    // Known-unsupported combination: repeatedly killing pacemakerd can
    // deadlock pacemaker's own recovery path. Deliberately skipped, and
    // recorded as such so it is distinguishable from "ran and failed".
    if daemon == ClusterDaemon::Pacemakerd && ctx.loop_mode {
        warn!("killing pacemakerd in a loop is not supported; skipping this scenario");
        record(
            ctx,
            CaseResult::skipped(
                ScenarioKind::KillPacemakerd,
                "pacemakerd kill-loop is known-unsupported; scenario skipped",
            ),
        );
        return Ok(());
    }

    let kind = ScenarioKind::for_daemon(daemon);
    ctx.current_case = Some(kind);
    let task = KillDaemon::new(host, daemon, ctx);
    let (task, phase, result) = drive(task).await;
    conclude(ctx, &task, kind, phase, result)
}

/// Fence-node entry point.
pub async fn fence_node<H: ClusterHost>(
    ctx: &mut RunContext,
    host: &H,
) -> Result<(), Termination> {
    if ctx.scenario != Some(ScenarioKind::FenceNode) {
        return Ok(());
    }
    let Some(target) = ctx.fence_target.clone() else {
        return Ok(());
    };

    ctx.current_case = Some(ScenarioKind::FenceNode);
    let task = FenceNode::new(host, target, ctx);
    let (task, phase, result) = drive(task).await;
    conclude(ctx, &task, ScenarioKind::FenceNode, phase, result)
}

/// Split-brain entry point.
///
/// Unlike the other scenarios this one cannot use the generic driver
/// unchanged: `run` and `wait` must execute strictly inside the corosync
/// block scope, and the block is released before the outcome is surfaced,
/// on the failure paths as well.
pub async fn split_brain<H: ClusterHost>(
    ctx: &mut RunContext,
    host: &H,
) -> Result<(), Termination> {
    if ctx.scenario != Some(ScenarioKind::SplitBrain) {
        return Ok(());
    }

    ctx.current_case = Some(ScenarioKind::SplitBrain);
    let mut task = SplitBrain::new(host, ctx);
    let mut phase = TaskPhase::Created;
    let result = async {
        task.pre_check().await?;
        phase = TaskPhase::Prechecked;
        task.print_header()?;
        task.enable_report().await?;
        phase = TaskPhase::ReportEnabled;

        let mut block = task.block().await?;
        let outcome = async {
            phase = TaskPhase::Running;
            task.run().await?;
            phase = TaskPhase::Observing;
            task.wait().await
        }
        .await;
        let restored = block.release();
        // The scenario outcome wins, but a failed restoration must never be
        // invisible, even when the scenario already failed.
        if let Err(e) = &restored {
            warn!("failed to restore corosync traffic: {e}");
        }

        let message = outcome?;
        restored?;
        phase = TaskPhase::Succeeded;
        Ok(message)
    }
    .await;
    conclude(ctx, &task, ScenarioKind::SplitBrain, phase, result)
}

/// Surface the outcome: log it, persist the case result, and convert a
/// scenario failure into the process-termination signal.
fn conclude<T: Task>(
    ctx: &mut RunContext,
    task: &T,
    kind: ScenarioKind,
    phase: TaskPhase,
    result: Result<String, ScenarioError>,
) -> Result<(), Termination> {
    match result {
        Ok(message) => {
            info!(scenario = %kind, "{message}");
            record(ctx, CaseResult::passed(kind, phase, message));
            Ok(())
        }
        Err(err) => {
            task.error(&err.to_string());
            record(ctx, CaseResult::failed(kind, phase, err.to_string()));
            Err(Termination::ScenarioFailed)
        }
    }
}

fn record(ctx: &mut RunContext, case: CaseResult) {
    if let Err(e) = ctx.sink.push(case) {
        warn!("failed to persist results to {}: {e}", ctx.sink.path().display());
    }
}
