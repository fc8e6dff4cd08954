//! Host executor backed by the system package manager, systemd, and `sh`.
//!
//! In dry-run mode nothing touches the host: actions are logged and reported
//! as successful.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use warden_core::types::{Action, Operation};

use crate::error::ExecutionError;
use crate::executor::{ActionExecutor, ExecutionReport};

/// Captured stdout/stderr beyond this many bytes is cut off.
const MAX_CAPTURE_BYTES: usize = 64 * 1024;

/// Executes actions on the local host.
#[derive(Debug, Clone, Default)]
pub struct HostExecutor {
    dry_run: bool,
}

impl HostExecutor {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    async fn run(&self, op: &Operation) -> Result<ExecutionReport, ExecutionError> {
        match op {
            Operation::FileWrite { path, content } => {
                tokio::fs::write(path, content).await?;
                Ok(ExecutionReport::success(format!(
                    "wrote {} bytes to {}",
                    content.len(),
                    path
                )))
            }
            Operation::PackageInstall { name } => {
                let mut cmd = Command::new("apt-get");
                cmd.args(["install", "-y", "--", name])
                    .env("DEBIAN_FRONTEND", "noninteractive");
                run_command(cmd).await
            }
            Operation::ServiceRestart { service } => {
                let mut cmd = Command::new("systemctl");
                cmd.args(["restart", "--", service]);
                run_command(cmd).await
            }
            Operation::ShellCommand { cmd: line } => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(line);
                run_command(cmd).await
            }
        }
    }
}

#[async_trait]
impl ActionExecutor for HostExecutor {
    async fn execute(&self, action: &Action) -> Result<ExecutionReport, ExecutionError> {
        let op = action
            .operation()
            .map_err(|e| ExecutionError::Failed(e.to_string()))?;

        if self.dry_run {
            info!(action = %op, "Dry run, action not executed");
            return Ok(ExecutionReport::success(format!("dry run: {}", op)));
        }

        debug!(action = %op, "Executing action");
        self.run(&op).await
    }
}

async fn run_command(mut cmd: Command) -> Result<ExecutionReport, ExecutionError> {
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    let stdout = capture(&output.stdout);
    let stderr = capture(&output.stderr);

    if output.status.success() {
        Ok(ExecutionReport::success(stdout))
    } else {
        let error = if stderr.is_empty() {
            output.status.to_string()
        } else {
            format!("{}: {}", output.status, stderr)
        };
        Ok(ExecutionReport::failure(stdout, error))
    }
}

fn capture(bytes: &[u8]) -> String {
    let cut = &bytes[..bytes.len().min(MAX_CAPTURE_BYTES)];
    String::from_utf8_lossy(cut).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::types::ActionKind;

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motd");
        let action = Action::new(
            ActionKind::FileWrite,
            &[("path", path.to_str().unwrap()), ("content", "hello")],
        );

        let report = HostExecutor::new(true).execute(&action).await.unwrap();
        assert!(report.success);
        assert!(report.output.starts_with("dry run:"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_file_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motd");
        let action = Action::new(
            ActionKind::FileWrite,
            &[("path", path.to_str().unwrap()), ("content", "hello")],
        );

        let report = HostExecutor::new(false).execute(&action).await.unwrap();
        assert!(report.success);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_file_write_missing_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("motd");
        let action = Action::new(
            ActionKind::FileWrite,
            &[("path", path.to_str().unwrap()), ("content", "x")],
        );
        let err = HostExecutor::new(false).execute(&action).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Io(_)));
    }

    #[tokio::test]
    async fn test_shell_command_captures_output() {
        let action = Action::new(ActionKind::ShellCommand, &[("cmd", "echo hello")]);
        let report = HostExecutor::new(false).execute(&action).await.unwrap();
        assert!(report.success);
        assert_eq!(report.output, "hello");
    }

    #[tokio::test]
    async fn test_shell_command_failure_reports_stderr() {
        let action = Action::new(ActionKind::ShellCommand, &[("cmd", "echo broken >&2; exit 3")]);
        let report = HostExecutor::new(false).execute(&action).await.unwrap();
        assert!(!report.success);
        let error = report.error.unwrap();
        assert!(error.contains("broken"));
        assert!(error.contains('3'));
    }

    #[tokio::test]
    async fn test_malformed_action_fails_without_running() {
        let action = Action::new(ActionKind::ShellCommand, &[]);
        let err = HostExecutor::new(false).execute(&action).await.unwrap_err();
        assert!(err.to_string().contains("unparseable action"));
    }

    #[test]
    fn test_capture_truncates() {
        let big = vec![b'a'; MAX_CAPTURE_BYTES + 10];
        assert_eq!(capture(&big).len(), MAX_CAPTURE_BYTES);
    }
}
