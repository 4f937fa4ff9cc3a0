//! Artifact paths for a run, namespaced by process name.

use std::io;
use std::path::{Path, PathBuf};

/// Where a run writes its artifacts: the variable-data directory, the report
/// directory, the JSON results file, and the log file.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub var_dir: PathBuf,
    pub report_dir: PathBuf,
    pub json_file: PathBuf,
    pub log_file: PathBuf,
}

impl RunPaths {
    /// System paths for a process name: `/var/lib/<name>` for data and
    /// reports, `/var/log/<name>.log` for the log stream.
    pub fn for_process(name: &str) -> Self {
        Self::with_base(Path::new("/"), name)
    }

    /// Same layout rebased under an arbitrary root. Tests use this with a
    /// temporary directory.
    pub fn with_base(root: &Path, name: &str) -> Self {
        let var_dir = root.join("var/lib").join(name);
        Self {
            report_dir: var_dir.clone(),
            json_file: var_dir.join(format!("{name}.json")),
            log_file: root.join("var/log").join(format!("{name}.log")),
            var_dir,
        }
    }

    /// Create the directories artifacts are written into.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.var_dir)?;
        if let Some(parent) = self.log_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_namespaced_by_process_name() {
        let paths = RunPaths::for_process("cct");
        assert_eq!(paths.var_dir, PathBuf::from("/var/lib/cct"));
        assert_eq!(paths.report_dir, PathBuf::from("/var/lib/cct"));
        assert_eq!(paths.json_file, PathBuf::from("/var/lib/cct/cct.json"));
        assert_eq!(paths.log_file, PathBuf::from("/var/log/cct.log"));
    }

    #[test]
    fn test_ensure_dirs_creates_layout_under_base() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = RunPaths::with_base(tmp.path(), "cct");
        paths.ensure_dirs().unwrap();
        assert!(paths.var_dir.is_dir());
        assert!(paths.log_file.parent().unwrap().is_dir());
    }
}
