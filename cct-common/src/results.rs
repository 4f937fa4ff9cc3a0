//! Append-only JSON results sink.
//!
//! Every recorded case is persisted immediately, so an interrupted run still
//! leaves whatever partial results were accumulated on disk.

use crate::types::CaseResult;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Accumulates [`CaseResult`]s and mirrors them to a JSON file.
#[derive(Debug)]
pub struct ResultsSink {
    path: PathBuf,
    cases: Vec<CaseResult>,
}

impl ResultsSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cases: Vec::new(),
        }
    }

    /// Record a case and persist the whole results array.
    pub fn push(&mut self, case: CaseResult) -> io::Result<()> {
        debug!(
            scenario = %case.scenario,
            outcome = ?case.outcome,
            "recording case result"
        );
        self.cases.push(case);
        self.flush()
    }

    /// Write the results file. Uses a temp-file-and-rename so a crash during
    /// the write cannot corrupt previously persisted results.
    pub fn flush(&self) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(&self.cases)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)
    }

    pub fn cases(&self) -> &[CaseResult] {
        &self.cases
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
