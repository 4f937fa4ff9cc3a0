//! Kill-daemon scenario: SIGKILL a cluster daemon and observe whether the
//! cluster restarts it or fences the node.
//!
//! Expected reactions:
//! - kill sbd/corosync: restarted or fenced
//! - kill sbd/corosync in a loop: fenced
//! - kill pacemakerd: restarted
//! - kill pacemakerd in a loop: not run (short-circuited by the orchestrator)

use crate::context::RunContext;
use crate::host::ClusterHost;
use crate::report::ReportCollector;
use crate::task::{Task, confirm_or_cancel};
use cct_common::{ClusterDaemon, ScenarioError, ScenarioKind};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct KillDaemon<'a, H> {
    host: &'a H,
    daemon: ClusterDaemon,
    loop_mode: bool,
    force: bool,
    poll_interval: Duration,
    timeout: Duration,
    report_dir: PathBuf,
    report: ReportCollector,
    /// PID seen before (or between) kills; a different PID means a restart.
    observed_pid: Option<u32>,
    injected_at: Option<DateTime<Utc>>,
    kills: u32,
}

impl<'a, H: ClusterHost> KillDaemon<'a, H> {
    pub fn new(host: &'a H, daemon: ClusterDaemon, ctx: &RunContext) -> Self {
        Self {
            host,
            daemon,
            loop_mode: ctx.loop_mode,
            force: ctx.force,
            poll_interval: ctx.poll_interval,
            timeout: ctx.task_timeout,
            report_dir: ctx.paths.report_dir.clone(),
            report: ReportCollector::new(),
            observed_pid: None,
            injected_at: None,
            kills: 0,
        }
    }

    /// Whether fencing is an expected reaction for this target.
    fn fence_expected(&self) -> bool {
        self.daemon != ClusterDaemon::Pacemakerd
    }

    fn expectation(&self) -> String {
        match (self.daemon, self.loop_mode) {
            (ClusterDaemon::Pacemakerd, _) => format!("{} to be restarted", self.daemon),
            (_, true) => "the node to be fenced".to_string(),
            (_, false) => format!("{} to be restarted or the node fenced", self.daemon),
        }
    }

    async fn observe(&mut self) -> Result<String, ScenarioError> {
        let Some(injected_at) = self.injected_at else {
            return Err(ScenarioError::Unexpected(
                "observation started before fault injection".into(),
            ));
        };
        let start = tokio::time::Instant::now();
        loop {
            if let Some(event) = self.host.fence_event_since(injected_at).await? {
                if self.fence_expected() {
                    return Ok(format!("node was fenced: {event}"));
                }
                return Err(ScenarioError::Unexpected(format!(
                    "node was fenced after killing {}: {event}",
                    self.daemon
                )));
            }

            if let Some(pid) = self.host.daemon_pid(self.daemon).await?
                && Some(pid) != self.observed_pid
            {
                let prev = self.observed_pid.unwrap_or_default();
                if self.loop_mode {
                    debug!(pid, kills = self.kills, "daemon restarted; killing again");
                    self.observed_pid = Some(pid);
                    self.kills += 1;
                    self.host.kill_daemon(self.daemon).await?;
                } else {
                    return Ok(format!(
                        "{} was restarted (pid {prev} -> {pid})",
                        self.daemon
                    ));
                }
            }

            if start.elapsed() >= self.timeout {
                return Err(ScenarioError::Timeout {
                    waited: self.timeout,
                    expectation: self.expectation(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl<H: ClusterHost> Task for KillDaemon<'_, H> {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::for_daemon(self.daemon)
    }

    fn describe(&self) -> String {
        if self.loop_mode {
            format!("kill {} in a loop until the node is fenced", self.daemon)
        } else {
            format!("kill {} once", self.daemon)
        }
    }

    async fn pre_check(&mut self) -> Result<(), ScenarioError> {
        match self.host.daemon_pid(self.daemon).await? {
            Some(pid) => {
                self.observed_pid = Some(pid);
                Ok(())
            }
            None => Err(ScenarioError::Precondition(format!(
                "{} is not running on this node",
                self.daemon
            ))),
        }
    }

    fn print_header(&self) -> Result<(), ScenarioError> {
        info!("=== {} ===", self.describe());
        info!("expecting {}", self.expectation());
        confirm_or_cancel(
            self.force,
            &format!("Kill {} and observe the cluster reaction?", self.daemon),
        )
    }

    async fn enable_report(&mut self) -> Result<(), ScenarioError> {
        self.report.arm();
        Ok(())
    }

    async fn run(&mut self) -> Result<(), ScenarioError> {
        self.injected_at = Some(Utc::now());
        self.kills = 1;
        info!(pid = self.observed_pid, "sending SIGKILL to {}", self.daemon);
        self.host.kill_daemon(self.daemon).await
    }

    async fn wait(&mut self) -> Result<String, ScenarioError> {
        let outcome = self.observe().await;
        // The report covers the failure window too; its own failure only
        // warns and never masks the scenario outcome.
        if let Err(e) = self.report.collect(self.host, &self.report_dir).await {
            warn!("report collection failed: {e}");
        }
        outcome
    }
}
