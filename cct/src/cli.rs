//! Command-line surface.
//!
//! The scenario selectors are mutually exclusive; modifiers and timeouts are
//! independent. Timeout flags take human-friendly durations ("90s", "2m").

use cct_common::{ClusterDaemon, ScenarioKind};
use clap::{ArgGroup, Parser};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "cct", version)]
#[command(about = "Cluster crash test - fault injection harness for HA clusters")]
#[command(long_about = "\
Cluster crash test tool set. It standardizes the steps to simulate cluster
failures and to verify key configuration before a cluster is moved into
production. Nothing harmful runs without operator confirmation unless
--force is given.")]
#[command(group(
    ArgGroup::new("scenario")
        .multiple(false)
        .args(["kill_sbd", "kill_corosync", "kill_pacemakerd", "fence_node", "split_brain"])
))]
pub struct Cli {
    /// Kill the sbd daemon
    #[arg(long)]
    pub kill_sbd: bool,

    /// Kill the corosync daemon
    #[arg(long)]
    pub kill_corosync: bool,

    /// Kill the pacemakerd daemon
    #[arg(long)]
    pub kill_pacemakerd: bool,

    /// Fence a specific node
    #[arg(long, value_name = "NODE")]
    pub fence_node: Option<String>,

    /// Produce a split brain by blocking corosync traffic
    #[arg(long = "split-brain-iptables")]
    pub split_brain: bool,

    /// Kill the target daemon in a loop, expecting the node to be fenced
    #[arg(short = 'l', long = "kill-loop")]
    pub loop_mode: bool,

    /// Skip all interactive confirmation prompts (use with caution: the
    /// selected fault will be injected without asking)
    #[arg(short, long)]
    pub force: bool,

    /// How long wait() observes for the expected cluster reaction
    #[arg(long, value_name = "DUR", value_parser = humantime::parse_duration, default_value = "60s")]
    pub task_timeout: Duration,

    /// How long wait() observes for a fencing action to complete
    #[arg(long, value_name = "DUR", value_parser = humantime::parse_duration, default_value = "60s")]
    pub fence_timeout: Duration,

    /// Interval between observation samples
    #[arg(long, value_name = "DUR", value_parser = humantime::parse_duration, default_value = "1s")]
    pub poll_interval: Duration,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The single selected scenario, if any.
    ///
    /// The clap group already rejects combined selectors; the priority order
    /// here (kill family, fence, split brain) is the tie-break of last
    /// resort should more than one flag ever be set programmatically.
    pub fn selected_scenario(&self) -> Option<ScenarioKind> {
        if self.kill_sbd {
            Some(ScenarioKind::KillSbd)
        } else if self.kill_corosync {
            Some(ScenarioKind::KillCorosync)
        } else if self.kill_pacemakerd {
            Some(ScenarioKind::KillPacemakerd)
        } else if self.fence_node.is_some() {
            Some(ScenarioKind::FenceNode)
        } else if self.split_brain {
            Some(ScenarioKind::SplitBrain)
        } else {
            None
        }
    }

    /// Kill target for the kill-family scenarios.
    pub fn kill_target(&self) -> Option<ClusterDaemon> {
        self.selected_scenario().and_then(ScenarioKind::daemon)
    }
}
