//! Fence-node scenario: ask the cluster to fence a specific node and
//! observe the fencing action completing.

use crate::context::RunContext;
use crate::host::ClusterHost;
use crate::task::{Task, confirm_or_cancel};
use cct_common::{ScenarioError, ScenarioKind};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{info, warn};

pub struct FenceNode<'a, H> {
    host: &'a H,
    target: String,
    force: bool,
    poll_interval: Duration,
    timeout: Duration,
    local_node: Option<String>,
    issued_at: Option<DateTime<Utc>>,
}

impl<'a, H: ClusterHost> FenceNode<'a, H> {
    pub fn new(host: &'a H, target: impl Into<String>, ctx: &RunContext) -> Self {
        Self {
            host,
            target: target.into(),
            force: ctx.force,
            poll_interval: ctx.poll_interval,
            timeout: ctx.fence_timeout,
            local_node: None,
            issued_at: None,
        }
    }
}

impl<H: ClusterHost> Task for FenceNode<'_, H> {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::FenceNode
    }

    fn describe(&self) -> String {
        format!("fence node {}", self.target)
    }

    async fn pre_check(&mut self) -> Result<(), ScenarioError> {
        if !self.host.is_cluster_member(&self.target).await? {
            return Err(ScenarioError::Precondition(format!(
                "node {} is not a cluster member",
                self.target
            )));
        }
        if !self.host.fencing_configured().await? {
            return Err(ScenarioError::Precondition(
                "stonith is disabled or no fence device is configured".into(),
            ));
        }
        self.local_node = Some(self.host.local_node().await?);
        Ok(())
    }

    fn print_header(&self) -> Result<(), ScenarioError> {
        info!("=== {} ===", self.describe());
        info!("expecting node {} to be fenced", self.target);
        if self.local_node.as_deref() == Some(self.target.as_str()) {
            warn!("fencing the local node; expect this host to reboot");
        }
        confirm_or_cancel(self.force, &format!("Fence node {}?", self.target))
    }

    // No report is produced for fence-node runs.
    async fn enable_report(&mut self) -> Result<(), ScenarioError> {
        Ok(())
    }

    async fn run(&mut self) -> Result<(), ScenarioError> {
        self.issued_at = Some(Utc::now());
        info!("issuing fence against {}", self.target);
        self.host.fence_node(&self.target).await
    }

    async fn wait(&mut self) -> Result<String, ScenarioError> {
        let Some(issued_at) = self.issued_at else {
            return Err(ScenarioError::Unexpected(
                "observation started before the fence was issued".into(),
            ));
        };
        let start = tokio::time::Instant::now();
        loop {
            if let Some(event) = self.host.fence_event_since(issued_at).await? {
                return Ok(format!("node {} was fenced: {event}", self.target));
            }
            if !self.host.is_cluster_member(&self.target).await? {
                return Ok(format!(
                    "node {} left the cluster membership",
                    self.target
                ));
            }
            if start.elapsed() >= self.timeout {
                return Err(ScenarioError::Timeout {
                    waited: self.timeout,
                    expectation: format!("node {} to be fenced", self.target),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;
    use crate::task::drive;
    use cct_common::TaskPhase;

    fn test_ctx(tmp: &std::path::Path) -> RunContext {
        RunContext::for_tests(tmp)
            .with_timeouts(Duration::from_secs(5), Duration::from_millis(100))
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_fence_runs_without_prompt() {
        let tmp = tempfile::tempdir().unwrap();
        let host = MockHost::new()
            .with_online(&[&["node1", "node2"], &["node1"]])
            .with_fencing_configured(true)
            .with_fence_events(&[Some("node2 was rebooted")]);
        // for_tests() sets force, so print_header never touches the terminal.
        let task = FenceNode::new(&host, "node2", &test_ctx(tmp.path()));

        let (_task, phase, result) = drive(task).await;
        assert_eq!(phase, TaskPhase::Succeeded);
        assert!(result.unwrap().contains("fenced"));
        assert_eq!(host.fence_calls(), vec!["node2".to_string()]);
    }

    #[tokio::test]
    async fn test_pre_check_rejects_non_member() {
        let tmp = tempfile::tempdir().unwrap();
        let host = MockHost::new()
            .with_online(&[&["node1"]])
            .with_fencing_configured(true);
        let mut task = FenceNode::new(&host, "node9", &test_ctx(tmp.path()));
        let err = task.pre_check().await.unwrap_err();
        assert!(matches!(err, ScenarioError::Precondition(_)));
        assert!(host.fence_calls().is_empty());
    }

    #[tokio::test]
    async fn test_pre_check_requires_fencing_configured() {
        let tmp = tempfile::tempdir().unwrap();
        let host = MockHost::new()
            .with_online(&[&["node1", "node2"]])
            .with_fencing_configured(false);
        let mut task = FenceNode::new(&host, "node2", &test_ctx(tmp.path()));
        let err = task.pre_check().await.unwrap_err();
        assert!(matches!(err, ScenarioError::Precondition(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_membership_loss_counts_as_fenced() {
        let tmp = tempfile::tempdir().unwrap();
        let host = MockHost::new()
            // Stays a member for one sample, then disappears.
            .with_online(&[&["node1", "node2"], &["node1", "node2"], &["node1"]])
            .with_fencing_configured(true);
        let task = FenceNode::new(&host, "node2", &test_ctx(tmp.path()));

        let (_task, phase, result) = drive(task).await;
        assert_eq!(phase, TaskPhase::Succeeded);
        assert!(result.unwrap().contains("left the cluster membership"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fence_wait_times_out() {
        let tmp = tempfile::tempdir().unwrap();
        let host = MockHost::new()
            .with_online(&[&["node1", "node2"]])
            .with_fencing_configured(true);
        let task = FenceNode::new(&host, "node2", &test_ctx(tmp.path()));

        let (_task, phase, result) = drive(task).await;
        assert_eq!(phase, TaskPhase::Observing);
        assert!(matches!(result.unwrap_err(), ScenarioError::Timeout { .. }));
    }
}
