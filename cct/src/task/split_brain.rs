//! Split-brain scenario: block corosync traffic so the cluster members lose
//! mutual visibility, then observe fencing resolving the partition.
//!
//! The traffic block is a scoped environment change: `run()` and `wait()`
//! execute strictly inside the [`CorosyncBlock`] scope, and the block is
//! removed on every exit path. A crashed or interrupted run must never leave
//! the network permanently partitioned.

use crate::context::RunContext;
use crate::host::ClusterHost;
use crate::task::{Task, confirm_or_cancel};
use cct_common::{ClusterDaemon, ScenarioError, ScenarioKind};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{error, info};

/// Scoped corosync traffic block.
///
/// `release()` removes the drop rules exactly once; `Drop` is the backstop
/// for panics and cancelled futures. Release is synchronous so the backstop
/// can run outside an async context.
pub struct CorosyncBlock<'a, H: ClusterHost> {
    host: &'a H,
    port: u16,
    released: bool,
}

impl<'a, H: ClusterHost> CorosyncBlock<'a, H> {
    /// Apply the traffic block and return the restoration handle.
    pub async fn acquire(host: &'a H) -> Result<Self, ScenarioError> {
        let port = host.block_corosync().await?;
        info!(port, "corosync traffic blocked");
        Ok(Self {
            host,
            port,
            released: false,
        })
    }

    /// Remove the traffic block. Idempotent.
    pub fn release(&mut self) -> Result<(), ScenarioError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.host.unblock_corosync(self.port)?;
        info!(port = self.port, "corosync traffic restored");
        Ok(())
    }
}

impl<H: ClusterHost> Drop for CorosyncBlock<'_, H> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.host.unblock_corosync(self.port) {
                error!("failed to restore corosync traffic on exit: {e}");
            } else {
                info!(port = self.port, "corosync traffic restored on exit");
            }
        }
    }
}

pub struct SplitBrain<'a, H> {
    host: &'a H,
    force: bool,
    poll_interval: Duration,
    timeout: Duration,
    peers: Vec<String>,
    blocked_at: Option<DateTime<Utc>>,
}

impl<'a, H: ClusterHost> SplitBrain<'a, H> {
    pub fn new(host: &'a H, ctx: &RunContext) -> Self {
        Self {
            host,
            force: ctx.force,
            poll_interval: ctx.poll_interval,
            timeout: ctx.task_timeout,
            peers: Vec::new(),
            blocked_at: None,
        }
    }

    /// Apply the scoped traffic block. Called by the orchestrator between
    /// `enable_report` and `run`; the returned guard wraps both mutating
    /// phases.
    pub async fn block(&mut self) -> Result<CorosyncBlock<'a, H>, ScenarioError> {
        let guard = CorosyncBlock::acquire(self.host).await?;
        self.blocked_at = Some(Utc::now());
        Ok(guard)
    }
}

impl<H: ClusterHost> Task for SplitBrain<'_, H> {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::SplitBrain
    }

    fn describe(&self) -> String {
        "produce a split brain by blocking corosync traffic".into()
    }

    async fn pre_check(&mut self) -> Result<(), ScenarioError> {
        if !self.host.has_tool("iptables").await {
            return Err(ScenarioError::Precondition("iptables is not installed".into()));
        }
        if self.host.daemon_pid(ClusterDaemon::Corosync).await?.is_none() {
            return Err(ScenarioError::Precondition(
                "corosync is not running on this node".into(),
            ));
        }
        let local = self.host.local_node().await?;
        let online = self.host.online_nodes().await?;
        self.peers = online.into_iter().filter(|n| *n != local).collect();
        if self.peers.is_empty() {
            return Err(ScenarioError::Precondition(
                "split brain needs at least two cluster members".into(),
            ));
        }
        Ok(())
    }

    fn print_header(&self) -> Result<(), ScenarioError> {
        info!("=== {} ===", self.describe());
        info!(peers = ?self.peers, "expecting the partition to be resolved by fencing");
        confirm_or_cancel(
            self.force,
            "Block corosync traffic and observe the cluster reaction?",
        )
    }

    async fn enable_report(&mut self) -> Result<(), ScenarioError> {
        Ok(())
    }

    /// The block is already in place; run verifies the partition took
    /// effect, i.e. at least one peer dropped out of our membership view.
    async fn run(&mut self) -> Result<(), ScenarioError> {
        let start = tokio::time::Instant::now();
        loop {
            let online = self.host.online_nodes().await?;
            if self.peers.iter().any(|p| !online.contains(p)) {
                info!("partition is visible; a peer left this node's view");
                return Ok(());
            }
            if start.elapsed() >= self.timeout {
                return Err(ScenarioError::Timeout {
                    waited: self.timeout,
                    expectation: "a peer to drop out after blocking corosync".into(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn wait(&mut self) -> Result<String, ScenarioError> {
        let Some(blocked_at) = self.blocked_at else {
            return Err(ScenarioError::Unexpected(
                "observation started before corosync was blocked".into(),
            ));
        };
        let start = tokio::time::Instant::now();
        loop {
            if let Some(event) = self.host.fence_event_since(blocked_at).await? {
                return Ok(format!("partition resolved by fencing: {event}"));
            }
            if start.elapsed() >= self.timeout {
                return Err(ScenarioError::Timeout {
                    waited: self.timeout,
                    expectation: "fencing to resolve the partition".into(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
