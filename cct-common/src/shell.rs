//! Thin shell helpers: command execution, PID liveness, privilege check.

use crate::errors::ScenarioError;
use tracing::debug;

/// Captured output of an external command.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run a command line through `sh -c`, capturing its output.
pub async fn run(cmd: &str) -> Result<CmdOutput, ScenarioError> {
    debug!(cmd, "running command");
    let output = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .output()
        .await?;
    Ok(CmdOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Like [`run`], but a non-zero exit becomes a [`ScenarioError::Command`].
pub async fn run_checked(cmd: &str) -> Result<CmdOutput, ScenarioError> {
    let output = run(cmd).await?;
    if output.success() {
        Ok(output)
    } else {
        Err(ScenarioError::Command {
            cmd: cmd.to_string(),
            status: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// Check whether a PID is alive.
///
/// Uses `kill(pid, 0)`, which checks for process existence without sending a
/// signal. EPERM means the process exists but we may not signal it; it is
/// treated as alive.
pub fn is_pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(pid_i32) = i32::try_from(pid) else {
        return false;
    };
    #[cfg(unix)]
    {
        // SAFETY: kill with signal 0 only probes for process existence; the
        // PID has been validated against platform bounds.
        let result = unsafe { libc::kill(pid_i32, 0) };
        if result == 0 {
            return true;
        }
        let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
        errno == libc::EPERM
    }
    #[cfg(not(unix))]
    {
        let _ = pid_i32;
        false
    }
}

/// Whether the process runs with root privileges.
pub fn is_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid takes no arguments and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let out = run("echo hello").await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_checked_reports_failing_command() {
        let err = run_checked("echo oops >&2; exit 3").await.unwrap_err();
        match err {
            ScenarioError::Command { status, stderr, .. } => {
                assert_eq!(status, 3);
                assert_eq!(stderr, "oops");
            }
            other => panic!("expected Command error, got {other:?}"),
        }
    }

    #[test]
    fn test_own_pid_is_alive() {
        assert!(is_pid_alive(std::process::id()));
    }

    #[test]
    fn test_pid_zero_is_not_alive() {
        assert!(!is_pid_alive(0));
    }

    #[test]
    fn test_out_of_range_pid_is_not_alive() {
        assert!(!is_pid_alive(u32::MAX));
    }
}
