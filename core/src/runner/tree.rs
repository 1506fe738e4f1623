//! Process-tree termination.
//!
//! Every child is spawned as the root of its own termination boundary
//! ([`isolate`]): a fresh process group on unix, a new process group on
//! Windows. On timeout the executor calls [`TreeTerminator::terminate_tree`]
//! exactly once; which backing implementation answers is decided once by
//! [`detect_terminator`] when the executor is built.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::{Child, Command};

#[derive(Debug, Error)]
pub enum TerminateError {
    #[error("tree-kill primitive unavailable: {0}")]
    Unavailable(String),

    #[error("tree-kill failed")]
    Failed(#[source] std::io::Error),
}

#[async_trait]
pub trait TreeTerminator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Kill `child` and every descendant inside its termination boundary.
    /// Returns without waiting for the processes to be reaped.
    async fn terminate_tree(&self, child: &mut Child) -> Result<(), TerminateError>;
}

/// Put the command in its own termination boundary before it is spawned.
pub fn isolate(cmd: &mut Command) {
    #[cfg(unix)]
    {
        cmd.process_group(0);
    }
    #[cfg(windows)]
    {
        use windows::Win32::System::Threading::CREATE_NEW_PROCESS_GROUP;
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP.0);
    }
}

/// Picks the tree-kill backing available on this host.
pub fn detect_terminator() -> Arc<dyn TreeTerminator> {
    #[cfg(unix)]
    {
        Arc::new(ProcessGroupTerminator)
    }
    #[cfg(windows)]
    {
        match which::which("taskkill") {
            Ok(path) => Arc::new(TaskkillTerminator::new(path)),
            Err(e) => {
                tracing::warn!(
                    target: "qcheck.executor",
                    terminator = "taskkill",
                    error.message = %e,
                    "taskkill not found; timeouts will only terminate the direct child"
                );
                Arc::new(DirectChildOnly)
            }
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        Arc::new(DirectChildOnly)
    }
}

/// Sends SIGKILL to the whole process group led by the child.
#[cfg(unix)]
pub struct ProcessGroupTerminator;

#[cfg(unix)]
#[async_trait]
impl TreeTerminator for ProcessGroupTerminator {
    fn name(&self) -> &'static str {
        "process-group"
    }

    async fn terminate_tree(&self, child: &mut Child) -> Result<(), TerminateError> {
        let Some(pid) = child.id() else {
            // already reaped
            return Ok(());
        };
        // SAFETY: killpg has no memory-safety preconditions; the child was
        // spawned with process_group(0) so its pid is also the pgid.
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if rc == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        Err(TerminateError::Failed(err))
    }
}

/// Uses `taskkill /T /F`, which walks the child's descendants.
#[cfg(windows)]
pub struct TaskkillTerminator {
    taskkill: std::path::PathBuf,
}

#[cfg(windows)]
impl TaskkillTerminator {
    pub fn new(taskkill: std::path::PathBuf) -> Self {
        Self { taskkill }
    }
}

#[cfg(windows)]
#[async_trait]
impl TreeTerminator for TaskkillTerminator {
    fn name(&self) -> &'static str {
        "taskkill"
    }

    async fn terminate_tree(&self, child: &mut Child) -> Result<(), TerminateError> {
        let Some(pid) = child.id() else {
            return Ok(());
        };
        let status = Command::new(&self.taskkill)
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
            .map_err(TerminateError::Failed)?;
        if status.success() {
            Ok(())
        } else {
            Err(TerminateError::Unavailable(format!(
                "taskkill exited with {}",
                status.code().unwrap_or(-1)
            )))
        }
    }
}

/// Placeholder backing for hosts without a tree-kill primitive; always
/// reports itself unavailable so the executor takes the direct-child path.
pub struct DirectChildOnly;

#[async_trait]
impl TreeTerminator for DirectChildOnly {
    fn name(&self) -> &'static str {
        "direct-child"
    }

    async fn terminate_tree(&self, _child: &mut Child) -> Result<(), TerminateError> {
        Err(TerminateError::Unavailable(
            "no tree-kill primitive on this platform".to_string(),
        ))
    }
}

/// Terminate, then kill, the direct child only. Descendants may survive.
pub async fn terminate_direct(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: plain signal delivery to a pid we own.
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
            if tokio::time::timeout(grace, child.wait()).await.is_ok() {
                return;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = grace;
    }
    if let Err(e) = child.kill().await {
        tracing::debug!(
            target: "qcheck.executor",
            pid = ?child.id(),
            error.message = %e,
            "direct child kill failed"
        );
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::process::Stdio;

    use super::*;

    #[tokio::test]
    async fn process_group_kill_stops_child() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 30"])
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        isolate(&mut cmd);
        let mut child = cmd.spawn().unwrap();

        ProcessGroupTerminator.terminate_tree(&mut child).await.unwrap();
        let status = tokio::time::timeout(Duration::from_secs(2), child.wait())
            .await
            .expect("child reaped within grace")
            .unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn already_reaped_child_is_ok() {
        let mut child = Command::new("true").spawn().unwrap();
        child.wait().await.unwrap();
        assert!(ProcessGroupTerminator.terminate_tree(&mut child).await.is_ok());
    }

    #[tokio::test]
    async fn direct_only_reports_unavailable() {
        let mut child = Command::new("sh")
            .args(["-c", "sleep 30"])
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let err = DirectChildOnly.terminate_tree(&mut child).await.unwrap_err();
        assert!(matches!(err, TerminateError::Unavailable(_)));
        terminate_direct(&mut child, Duration::from_millis(500)).await;
        let status = tokio::time::timeout(Duration::from_secs(2), child.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(!status.success());
    }
}
