//! Host abstraction between the lifecycle protocol and the concrete
//! daemon/cluster procedures.
//!
//! `LocalHost` talks to the real cluster through the standard tooling
//! (pgrep/pkill, crm_node, crm, stonith_admin, iptables). Tests drive the
//! orchestrator against a scripted mock instead, so every lifecycle property
//! is exercisable without a live cluster.

use cct_common::shell;
use cct_common::{ClusterDaemon, ScenarioError};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::path::Path;
use tracing::{debug, warn};

/// Operations a scenario needs from the host/cluster.
///
/// `unblock_corosync` is deliberately synchronous so the scoped-change guard
/// can run it from `Drop` when a run is interrupted mid-flight.
pub trait ClusterHost: Sync {
    /// PID of the daemon, if it is currently running.
    async fn daemon_pid(&self, daemon: ClusterDaemon) -> Result<Option<u32>, ScenarioError>;

    /// SIGKILL the daemon.
    async fn kill_daemon(&self, daemon: ClusterDaemon) -> Result<(), ScenarioError>;

    /// Name of the node this process runs on.
    async fn local_node(&self) -> Result<String, ScenarioError>;

    /// Nodes currently part of the cluster membership.
    async fn online_nodes(&self) -> Result<Vec<String>, ScenarioError>;

    /// Whether the node is a current cluster member.
    async fn is_cluster_member(&self, node: &str) -> Result<bool, ScenarioError>;

    /// Whether stonith is enabled and a fence device is configured.
    async fn fencing_configured(&self) -> Result<bool, ScenarioError>;

    /// Issue a fence command against the node.
    async fn fence_node(&self, node: &str) -> Result<(), ScenarioError>;

    /// A fencing action observed at or after `since`, if any.
    async fn fence_event_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Option<String>, ScenarioError>;

    /// Whether an external tool is installed.
    async fn has_tool(&self, name: &str) -> bool;

    /// Drop corosync traffic. Returns the blocked port for later removal.
    async fn block_corosync(&self) -> Result<u16, ScenarioError>;

    /// Remove the corosync drop rules. Must be callable from `Drop`.
    fn unblock_corosync(&self, port: u16) -> Result<(), ScenarioError>;

    /// Capture cluster diagnostics covering `since` until now into `dest`.
    async fn collect_report(
        &self,
        since: DateTime<Utc>,
        dest: &Path,
    ) -> Result<(), ScenarioError>;
}

/// Default corosync totem port when the running configuration does not
/// expose one.
const DEFAULT_COROSYNC_PORT: u16 = 5405;

/// The node this process runs on, driven through the cluster CLI tooling.
pub struct LocalHost;

impl ClusterHost for LocalHost {
    async fn daemon_pid(&self, daemon: ClusterDaemon) -> Result<Option<u32>, ScenarioError> {
        let out = shell::run(&format!("pgrep -x {} | head -n1", daemon.as_str())).await?;
        // pgrep output can be stale by the time it is read; confirm the PID
        // still exists before reporting the daemon as running.
        Ok(out
            .stdout
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|&pid| shell::is_pid_alive(pid)))
    }

    async fn kill_daemon(&self, daemon: ClusterDaemon) -> Result<(), ScenarioError> {
        shell::run_checked(&format!("pkill -9 -x {}", daemon.as_str())).await?;
        Ok(())
    }

    async fn local_node(&self) -> Result<String, ScenarioError> {
        let out = shell::run_checked("crm_node --name").await?;
        Ok(out.stdout.trim().to_string())
    }

    async fn online_nodes(&self) -> Result<Vec<String>, ScenarioError> {
        // crm_node -l lines look like: "<id> <name> <membership>"
        let out = shell::run_checked("crm_node -l").await?;
        Ok(out
            .stdout
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let _id = fields.next()?;
                let name = fields.next()?;
                let membership = fields.next()?;
                (membership == "member").then(|| name.to_string())
            })
            .collect())
    }

    async fn is_cluster_member(&self, node: &str) -> Result<bool, ScenarioError> {
        Ok(self.online_nodes().await?.iter().any(|n| n == node))
    }

    async fn fencing_configured(&self) -> Result<bool, ScenarioError> {
        let enabled = shell::run("crm_attribute -t crm_config -n stonith-enabled -G -q").await?;
        if !enabled.success() || enabled.stdout.trim() != "true" {
            return Ok(false);
        }
        let devices = shell::run("stonith_admin --list-registered").await?;
        Ok(devices.success() && devices.stdout.lines().any(|l| !l.trim().is_empty()))
    }

    async fn fence_node(&self, node: &str) -> Result<(), ScenarioError> {
        shell::run_checked(&format!("crm --force node fence {node}")).await?;
        Ok(())
    }

    async fn fence_event_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Option<String>, ScenarioError> {
        let out = shell::run("stonith_admin --history '*'").await?;
        if !out.success() {
            return Ok(None);
        }
        for line in out.stdout.lines() {
            let line = line.trim();
            if !line.contains(" at ") {
                continue;
            }
            if let Some(at) = parse_fence_history_timestamp(line)
                && at >= since
            {
                return Ok(Some(line.to_string()));
            }
        }
        Ok(None)
    }

    async fn has_tool(&self, name: &str) -> bool {
        which::which(name).is_ok()
    }

    async fn block_corosync(&self) -> Result<u16, ScenarioError> {
        let port = corosync_port().await;
        debug!(port, "blocking corosync traffic");
        // Both inserts run in one command, so there is no await point where
        // a cancelled future could leave only the INPUT rule behind. A
        // partial insert is rolled back before the error surfaces.
        if let Err(e) = shell::run_checked(&block_rules_cmd(port)).await {
            let _ = self.unblock_corosync(port);
            return Err(e);
        }
        Ok(port)
    }

    fn unblock_corosync(&self, port: u16) -> Result<(), ScenarioError> {
        // Synchronous on purpose: this runs from Drop when a run is
        // interrupted. Removal of an absent rule is not an error.
        let mut last_err = None;
        for chain in ["INPUT", "OUTPUT"] {
            let status = std::process::Command::new("sh")
                .arg("-c")
                .arg(format!(
                    "iptables -D {chain} -p udp --dport {port} -j DROP 2>/dev/null"
                ))
                .status();
            match status {
                Ok(s) if s.success() => {}
                Ok(_) => {}
                Err(e) => last_err = Some(e),
            }
        }
        match last_err {
            Some(e) => Err(ScenarioError::Io(e)),
            None => Ok(()),
        }
    }

    async fn collect_report(
        &self,
        since: DateTime<Utc>,
        dest: &Path,
    ) -> Result<(), ScenarioError> {
        let from = since.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
        shell::run_checked(&format!("crm report -f '{from}' {}", dest.display())).await?;
        Ok(())
    }
}

/// Totem port from the running corosync configuration, falling back to the
/// conventional default.
async fn corosync_port() -> u16 {
    match shell::run("corosync-cmapctl -g totem.mcastport").await {
        Ok(out) if out.success() => out
            .stdout
            .rsplit(|c: char| c.is_whitespace() || c == '=')
            .find_map(|tok| tok.parse::<u16>().ok())
            .unwrap_or(DEFAULT_COROSYNC_PORT),
        Ok(_) => DEFAULT_COROSYNC_PORT,
        Err(e) => {
            warn!("could not read totem.mcastport: {e}");
            DEFAULT_COROSYNC_PORT
        }
    }
}

/// Drop rules for both directions as one shell command.
fn block_rules_cmd(port: u16) -> String {
    format!(
        "iptables -I INPUT -p udp --dport {port} -j DROP && \
         iptables -I OUTPUT -p udp --dport {port} -j DROP"
    )
}

/// Parse the trailing timestamp of a stonith history line, e.g.
/// "... from node1 at Mon Aug 25 12:00:00 2026".
fn parse_fence_history_timestamp(line: &str) -> Option<DateTime<Utc>> {
    let (_, stamp) = line.rsplit_once(" at ")?;
    let naive = NaiveDateTime::parse_from_str(stamp.trim(), "%a %b %e %H:%M:%S %Y").ok()?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted cluster host for orchestrator and task tests.
    //!
    //! Scripted answers are consumed front-to-back; the last entry repeats
    //! once the script is exhausted.

    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct State {
        pid_script: Vec<Option<u32>>,
        kills: Vec<ClusterDaemon>,
        local: String,
        online_script: Vec<Vec<String>>,
        fencing: bool,
        fence_calls: Vec<String>,
        fence_event_script: Vec<Option<String>>,
        tools: Vec<String>,
        blocked: bool,
        unblock_fails: bool,
        unblock_calls: u32,
        reports: Vec<PathBuf>,
    }

    pub struct MockHost {
        state: Mutex<State>,
    }

    fn next_scripted<T: Clone>(script: &mut Vec<T>) -> Option<T> {
        if script.len() > 1 {
            Some(script.remove(0))
        } else {
            script.first().cloned()
        }
    }

    impl MockHost {
        pub fn new() -> Self {
            Self {
                state: Mutex::new(State {
                    local: "node1".into(),
                    ..State::default()
                }),
            }
        }

        /// Successive answers for `daemon_pid`; the last one repeats.
        pub fn with_pids(self, pids: &[Option<u32>]) -> Self {
            self.state.lock().unwrap().pid_script = pids.to_vec();
            self
        }

        /// Successive membership views; the last one repeats.
        pub fn with_online(self, views: &[&[&str]]) -> Self {
            self.state.lock().unwrap().online_script = views
                .iter()
                .map(|v| v.iter().map(|s| s.to_string()).collect())
                .collect();
            self
        }

        pub fn with_fencing_configured(self, yes: bool) -> Self {
            self.state.lock().unwrap().fencing = yes;
            self
        }

        /// Successive answers for `fence_event_since`; the last one repeats.
        pub fn with_fence_events(self, events: &[Option<&str>]) -> Self {
            self.state.lock().unwrap().fence_event_script = events
                .iter()
                .map(|e| e.map(|s| s.to_string()))
                .collect();
            self
        }

        /// Make every unblock attempt fail while still being recorded.
        pub fn with_unblock_failure(self) -> Self {
            self.state.lock().unwrap().unblock_fails = true;
            self
        }

        pub fn with_tool(self, name: &str) -> Self {
            self.state.lock().unwrap().tools.push(name.to_string());
            self
        }

        pub fn kills(&self) -> Vec<ClusterDaemon> {
            self.state.lock().unwrap().kills.clone()
        }

        pub fn fence_calls(&self) -> Vec<String> {
            self.state.lock().unwrap().fence_calls.clone()
        }

        pub fn is_blocked(&self) -> bool {
            self.state.lock().unwrap().blocked
        }

        pub fn unblock_calls(&self) -> u32 {
            self.state.lock().unwrap().unblock_calls
        }

        pub fn reports(&self) -> Vec<PathBuf> {
            self.state.lock().unwrap().reports.clone()
        }
    }

    impl ClusterHost for MockHost {
        async fn daemon_pid(&self, _daemon: ClusterDaemon) -> Result<Option<u32>, ScenarioError> {
            let mut state = self.state.lock().unwrap();
            Ok(next_scripted(&mut state.pid_script).flatten())
        }

        async fn kill_daemon(&self, daemon: ClusterDaemon) -> Result<(), ScenarioError> {
            self.state.lock().unwrap().kills.push(daemon);
            Ok(())
        }

        async fn local_node(&self) -> Result<String, ScenarioError> {
            Ok(self.state.lock().unwrap().local.clone())
        }

        async fn online_nodes(&self) -> Result<Vec<String>, ScenarioError> {
            let mut state = self.state.lock().unwrap();
            Ok(next_scripted(&mut state.online_script).unwrap_or_default())
        }

        async fn is_cluster_member(&self, node: &str) -> Result<bool, ScenarioError> {
            Ok(self.online_nodes().await?.iter().any(|n| n == node))
        }

        async fn fencing_configured(&self) -> Result<bool, ScenarioError> {
            Ok(self.state.lock().unwrap().fencing)
        }

        async fn fence_node(&self, node: &str) -> Result<(), ScenarioError> {
            self.state.lock().unwrap().fence_calls.push(node.to_string());
            Ok(())
        }

        async fn fence_event_since(
            &self,
            _since: DateTime<Utc>,
        ) -> Result<Option<String>, ScenarioError> {
            let mut state = self.state.lock().unwrap();
            Ok(next_scripted(&mut state.fence_event_script).flatten())
        }

        async fn has_tool(&self, name: &str) -> bool {
            self.state.lock().unwrap().tools.iter().any(|t| t == name)
        }

        async fn block_corosync(&self) -> Result<u16, ScenarioError> {
            self.state.lock().unwrap().blocked = true;
            Ok(DEFAULT_COROSYNC_PORT)
        }

        fn unblock_corosync(&self, _port: u16) -> Result<(), ScenarioError> {
            let mut state = self.state.lock().unwrap();
            state.unblock_calls += 1;
            if state.unblock_fails {
                return Err(ScenarioError::Unexpected(
                    "iptables rule removal failed".into(),
                ));
            }
            state.blocked = false;
            Ok(())
        }

        async fn collect_report(
            &self,
            _since: DateTime<Utc>,
            dest: &Path,
        ) -> Result<(), ScenarioError> {
            self.state.lock().unwrap().reports.push(dest.to_path_buf());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fence_history_timestamp() {
        let line = "node2 was able to reboot node node1 on behalf of \
                    pacemaker-controld.node2 from node2 at Tue Aug 25 12:00:00 2026";
        let parsed = parse_fence_history_timestamp(line).expect("should parse");
        let local = parsed.with_timezone(&Local);
        assert_eq!(local.format("%Y-%m-%d %H:%M:%S").to_string(), "2026-08-25 12:00:00");
    }

    #[test]
    fn test_block_rules_are_one_command() {
        let cmd = block_rules_cmd(5405);
        assert!(cmd.contains("-I INPUT -p udp --dport 5405 -j DROP"));
        assert!(cmd.contains("-I OUTPUT -p udp --dport 5405 -j DROP"));
        assert!(cmd.contains(" && "));
    }

    #[test]
    fn test_parse_fence_history_rejects_garbage() {
        assert!(parse_fence_history_timestamp("no timestamp here").is_none());
        assert!(parse_fence_history_timestamp("ends at not-a-date").is_none());
    }
}
