//! Common types used across CCT components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cluster control daemons that can be targeted by the kill-family scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterDaemon {
    Sbd,
    Corosync,
    Pacemakerd,
}

impl ClusterDaemon {
    /// Process name as it appears in the process table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sbd => "sbd",
            Self::Corosync => "corosync",
            Self::Pacemakerd => "pacemakerd",
        }
    }
}

impl std::fmt::Display for ClusterDaemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fault-injection scenario. Exactly one is selected per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    KillSbd,
    KillCorosync,
    KillPacemakerd,
    FenceNode,
    SplitBrain,
}

impl ScenarioKind {
    /// The daemon a kill-family scenario targets, if any.
    pub fn daemon(self) -> Option<ClusterDaemon> {
        match self {
            Self::KillSbd => Some(ClusterDaemon::Sbd),
            Self::KillCorosync => Some(ClusterDaemon::Corosync),
            Self::KillPacemakerd => Some(ClusterDaemon::Pacemakerd),
            Self::FenceNode | Self::SplitBrain => None,
        }
    }

    /// Scenario for a given kill target.
    pub fn for_daemon(daemon: ClusterDaemon) -> Self {
        match daemon {
            ClusterDaemon::Sbd => Self::KillSbd,
            ClusterDaemon::Corosync => Self::KillCorosync,
            ClusterDaemon::Pacemakerd => Self::KillPacemakerd,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::KillSbd => "kill_sbd",
            Self::KillCorosync => "kill_corosync",
            Self::KillPacemakerd => "kill_pacemakerd",
            Self::FenceNode => "fence_node",
            Self::SplitBrain => "split_brain",
        }
    }
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle position of a task. Phases only ever advance, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    Created,
    Prechecked,
    ReportEnabled,
    Running,
    Observing,
    Succeeded,
    Failed,
}

impl std::fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Prechecked => "prechecked",
            Self::ReportEnabled => "report_enabled",
            Self::Running => "running",
            Self::Observing => "observing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Terminal classification of a scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseOutcome {
    /// The injected fault produced the expected cluster reaction.
    Passed,
    /// A lifecycle phase failed, the reaction was unexpected, or observation
    /// timed out.
    Failed,
    /// The scenario was deliberately not run (known-unsupported combination).
    Skipped,
}

/// Reportable unit for one scenario run: what ran, how far it got, and how
/// it ended. Serialized into the per-run JSON results file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub scenario: ScenarioKind,
    /// Furthest lifecycle phase the task reached.
    pub phase: TaskPhase,
    pub outcome: CaseOutcome,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl CaseResult {
    pub fn passed(scenario: ScenarioKind, phase: TaskPhase, message: impl Into<String>) -> Self {
        Self::record(scenario, phase, CaseOutcome::Passed, message)
    }

    pub fn failed(scenario: ScenarioKind, phase: TaskPhase, message: impl Into<String>) -> Self {
        Self::record(scenario, phase, CaseOutcome::Failed, message)
    }

    pub fn skipped(scenario: ScenarioKind, message: impl Into<String>) -> Self {
        Self::record(scenario, TaskPhase::Created, CaseOutcome::Skipped, message)
    }

    fn record(
        scenario: ScenarioKind,
        phase: TaskPhase,
        outcome: CaseOutcome,
        message: impl Into<String>,
    ) -> Self {
        Self {
            scenario,
            phase,
            outcome,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
