use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::config::ExecutorConfig;
use crate::error::LaunchError;

use super::capture::CaptureBuffer;
use super::exit::{normalize_exit, ABNORMAL_EXIT_CODE, TIMEOUT_EXIT_CODE};
use super::tee;
use super::tree::{self, TreeTerminator};
use super::types::{ExecutionRequest, ExecutionResult};

/// Runs one analysis tool per call. Holds no per-run state, so one executor
/// can serve any number of concurrent requests.
pub struct Executor {
    terminator: Arc<dyn TreeTerminator>,
    capture_bytes: usize,
    kill_grace: Duration,
    drain_grace: Duration,
}

impl Executor {
    pub fn new(cfg: &ExecutorConfig) -> Self {
        Self::with_terminator(cfg, tree::detect_terminator())
    }

    pub fn with_terminator(cfg: &ExecutorConfig, terminator: Arc<dyn TreeTerminator>) -> Self {
        tracing::debug!(
            target: "qcheck.executor",
            terminator = terminator.name(),
            "executor ready"
        );
        Self {
            terminator,
            capture_bytes: cfg.capture_bytes,
            kill_grace: Duration::from_millis(cfg.kill_grace_ms),
            drain_grace: Duration::from_millis(cfg.drain_grace_ms),
        }
    }

    pub fn terminator_name(&self) -> &'static str {
        self.terminator.name()
    }

    pub async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, LaunchError> {
        let started_at = Utc::now();
        let started = Instant::now();

        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .envs(&request.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &request.cwd {
            cmd.current_dir(cwd);
        }
        tree::isolate(&mut cmd);

        let mut child = cmd
            .spawn()
            .map_err(|e| LaunchError::new(request.program.clone(), e))?;

        tracing::debug!(
            target: "qcheck.executor",
            tool = %request.tool,
            pid = ?child.id(),
            detail_capture = request.detail_capture,
            "process spawned"
        );

        let out_buf = CaptureBuffer::new(self.capture_bytes);
        let err_buf = CaptureBuffer::new(self.capture_bytes);
        let out_task = child
            .stdout
            .take()
            .map(|s| tee::pump(s, out_buf.clone(), "stdout"));
        let err_task = child
            .stderr
            .take()
            .map(|s| tee::pump(s, err_buf.clone(), "stderr"));

        let waited = tokio::time::timeout(request.timeout(), child.wait()).await;
        let (exit_code, timed_out, tree_kill_degraded) = match waited {
            Ok(Ok(status)) => (normalize_exit(status), false, false),
            Ok(Err(e)) => {
                tracing::error!(
                    target: "qcheck.executor",
                    tool = %request.tool,
                    error.kind = "executor.wait",
                    error.message = %e,
                    "waiting for the tool failed; terminating its process tree"
                );
                let degraded = self.kill_tree(&mut child, &request.tool).await;
                (ABNORMAL_EXIT_CODE, false, degraded)
            }
            Err(_) => {
                tracing::warn!(
                    target: "qcheck.executor",
                    tool = %request.tool,
                    timeout_secs = request.timeout_secs,
                    "timeout fired; terminating process tree"
                );
                let degraded = self.kill_tree(&mut child, &request.tool).await;
                (TIMEOUT_EXIT_CODE, true, degraded)
            }
        };

        // Descendants that inherited a pipe can keep it open after the child
        // exits; the drains are joined with a bounded grace.
        self.join_pump(out_task, "stdout", &request.tool).await;
        self.join_pump(err_task, "stderr", &request.tool).await;

        Ok(ExecutionResult {
            exit_code,
            stdout: out_buf.to_string_lossy(),
            stderr: err_buf.to_string_lossy(),
            timed_out,
            duration: started.elapsed(),
            started_at,
            stdout_dropped_bytes: out_buf.dropped(),
            stderr_dropped_bytes: err_buf.dropped(),
            tree_kill_degraded,
        })
    }

    /// Returns true when only the direct child could be terminated.
    async fn kill_tree(&self, child: &mut Child, tool: &str) -> bool {
        let degraded = match self.terminator.terminate_tree(child).await {
            Ok(()) => false,
            Err(e) => {
                tracing::warn!(
                    target: "qcheck.executor",
                    tool,
                    terminator = self.terminator.name(),
                    error.message = %e,
                    "tree kill unavailable; terminating direct child only, descendants may be orphaned"
                );
                tree::terminate_direct(child, self.kill_grace).await;
                true
            }
        };

        if tokio::time::timeout(self.kill_grace, child.wait()).await.is_err() {
            tracing::warn!(
                target: "qcheck.executor",
                tool,
                grace_ms = self.kill_grace.as_millis() as u64,
                "process not reaped within kill grace"
            );
        }
        degraded
    }

    async fn join_pump(&self, task: Option<JoinHandle<()>>, stream: &'static str, tool: &str) {
        let Some(mut task) = task else {
            return;
        };
        if tokio::time::timeout(self.drain_grace, &mut task).await.is_err() {
            task.abort();
            tracing::warn!(
                target: "qcheck.executor",
                tool,
                stream,
                "pipe still held open after exit; capture cut short"
            );
        }
    }
}
