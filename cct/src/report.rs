//! Post-mortem report arming and collection for the kill-family scenarios.

use crate::host::ClusterHost;
use cct_common::ScenarioError;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

/// Arms report capture before the fault is injected, then collects cluster
/// diagnostics covering the window from arming until the outcome was
/// classified.
#[derive(Debug, Default)]
pub struct ReportCollector {
    armed_at: Option<DateTime<Utc>>,
}

impl ReportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm collection. The arming instant is the report's start-of-window.
    pub fn arm(&mut self) {
        self.armed_at = Some(Utc::now());
        info!("report collection armed");
    }

    pub fn is_armed(&self) -> bool {
        self.armed_at.is_some()
    }

    /// Collect diagnostics into the report directory. No-op when not armed.
    pub async fn collect<H: ClusterHost>(
        &self,
        host: &H,
        report_dir: &Path,
    ) -> Result<Option<PathBuf>, ScenarioError> {
        let Some(armed_at) = self.armed_at else {
            return Ok(None);
        };
        let dest = report_dir.join(format!("report-{}", armed_at.format("%Y%m%d-%H%M%S")));
        host.collect_report(armed_at, &dest).await?;
        info!(report = %dest.display(), "cluster report collected");
        Ok(Some(dest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;

    #[tokio::test]
    async fn test_collect_is_a_noop_when_unarmed() {
        let host = MockHost::new();
        let collector = ReportCollector::new();
        let collected = collector.collect(&host, Path::new("/tmp")).await.unwrap();
        assert!(collected.is_none());
        assert!(host.reports().is_empty());
    }

    #[tokio::test]
    async fn test_collect_captures_into_report_dir() {
        let host = MockHost::new();
        let mut collector = ReportCollector::new();
        collector.arm();
        assert!(collector.is_armed());

        let dest = collector
            .collect(&host, Path::new("/var/lib/cct"))
            .await
            .unwrap()
            .expect("armed collector should produce a report path");
        assert!(dest.starts_with("/var/lib/cct"));
        assert_eq!(host.reports(), vec![dest]);
    }
}
