//! Process-wide run context.
//!
//! Constructed once at process start from the parsed arguments; read-only
//! for the rest of the run except the current-scenario marker and the
//! results sink. There is no ambient/global instance: the context is passed
//! by reference into the orchestrator and each task constructor.

use crate::cli::Cli;
use cct_common::{ResultsSink, RunPaths, ScenarioKind};
use std::time::Duration;

pub struct RunContext {
    pub process_name: String,
    /// The single selected scenario for this run.
    pub scenario: Option<ScenarioKind>,
    /// Target node for the fence scenario.
    pub fence_target: Option<String>,
    pub loop_mode: bool,
    pub force: bool,
    pub task_timeout: Duration,
    pub fence_timeout: Duration,
    pub poll_interval: Duration,
    pub paths: RunPaths,
    /// Scenario currently being driven, at most one per run.
    pub current_case: Option<ScenarioKind>,
    pub sink: ResultsSink,
}

impl RunContext {
    pub fn new(process_name: &str, cli: &Cli, paths: RunPaths) -> Self {
        Self {
            process_name: process_name.to_string(),
            scenario: cli.selected_scenario(),
            fence_target: cli.fence_node.clone(),
            loop_mode: cli.loop_mode,
            force: cli.force,
            task_timeout: cli.task_timeout,
            fence_timeout: cli.fence_timeout,
            poll_interval: cli.poll_interval,
            sink: ResultsSink::new(paths.json_file.clone()),
            paths,
            current_case: None,
        }
    }
}

#[cfg(test)]
impl RunContext {
    /// Context rebased under a temporary directory, with force set so no
    /// test ever touches the terminal.
    pub fn for_tests(base: &std::path::Path) -> Self {
        let paths = RunPaths::with_base(base, "cct");
        paths.ensure_dirs().unwrap();
        Self {
            process_name: "cct".into(),
            scenario: None,
            fence_target: None,
            loop_mode: false,
            force: true,
            task_timeout: Duration::from_secs(60),
            fence_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            sink: ResultsSink::new(paths.json_file.clone()),
            paths,
            current_case: None,
        }
    }

    pub fn with_scenario(mut self, scenario: ScenarioKind) -> Self {
        self.scenario = Some(scenario);
        self
    }

    pub fn with_fence_target(mut self, node: &str) -> Self {
        self.scenario = Some(ScenarioKind::FenceNode);
        self.fence_target = Some(node.to_string());
        self
    }

    pub fn with_loop_mode(mut self, loop_mode: bool) -> Self {
        self.loop_mode = loop_mode;
        self
    }

    /// Same bound for both observation timeouts, plus the sampling interval.
    pub fn with_timeouts(mut self, timeout: Duration, poll: Duration) -> Self {
        self.task_timeout = timeout;
        self.fence_timeout = timeout;
        self.poll_interval = poll;
        self
    }
}
