//! End-to-end executor behavior against real child processes.
#![cfg(unix)]

use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use qcheck_core::config::ExecutorConfig;
use qcheck_core::runner::exit::TIMEOUT_EXIT_CODE;
use qcheck_core::runner::{ExecutionRequest, Executor};

fn executor() -> Executor {
    Executor::new(&ExecutorConfig::default())
}

fn sh(script: &str) -> ExecutionRequest {
    ExecutionRequest::new("sh", "sh").with_args(["-c", script])
}

#[cfg(target_os = "linux")]
fn is_gone(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Err(_) => true,
        // state follows the parenthesised command name; Z and X are dead
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_some_and(|state| state == "Z" || state == "X"),
    }
}

#[tokio::test]
async fn test_normal_completion_captures_both_streams() {
    let result = executor()
        .execute(&sh("echo out; echo err >&2"))
        .await
        .unwrap();
    assert_eq!(result.exit_code, 0);
    assert!(!result.timed_out);
    assert_eq!(result.stdout, "out\n");
    assert_eq!(result.stderr, "err\n");
    assert!(result.success());
}

#[tokio::test]
async fn test_nonzero_exit_is_a_result_not_an_error() {
    let result = executor().execute(&sh("echo failing; exit 3")).await.unwrap();
    assert_eq!(result.exit_code, 3);
    assert!(!result.timed_out);
    assert!(!result.success());
}

#[tokio::test]
async fn test_missing_executable_is_launch_error() {
    let err = executor()
        .execute(&ExecutionRequest::new("missing", "/definitely/not/here/qcheck-missing-tool"))
        .await
        .unwrap_err();
    assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
    assert_eq!(err.program, "/definitely/not/here/qcheck-missing-tool");
    assert!(err.to_string().starts_with("failed to launch"));
}

#[tokio::test]
async fn test_timeout_kills_whole_tree() {
    let started = Instant::now();
    let result = executor()
        .execute(&sh("sleep 10 & echo $!; wait").with_timeout_secs(1))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(result.timed_out);
    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert!(!result.tree_kill_degraded);
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");

    let grandchild: u32 = result.stdout.trim().parse().unwrap();
    #[cfg(target_os = "linux")]
    {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !is_gone(grandchild) && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(is_gone(grandchild), "background sleep {grandchild} survived");
    }
    #[cfg(not(target_os = "linux"))]
    let _ = grandchild;
}

#[tokio::test]
async fn test_timeout_keeps_partial_output() {
    let result = executor()
        .execute(&sh("echo started; echo warming >&2; sleep 10").with_timeout_secs(1))
        .await
        .unwrap();
    assert!(result.timed_out);
    assert_eq!(result.stdout, "started\n");
    assert_eq!(result.stderr, "warming\n");
}

#[tokio::test]
async fn test_large_output_on_both_streams_does_not_deadlock() {
    let script = "head -c 1048576 /dev/zero | tr '\\0' a; head -c 1048576 /dev/zero | tr '\\0' b >&2";
    let result = executor()
        .execute(&sh(script).with_timeout_secs(30))
        .await
        .unwrap();
    assert!(!result.timed_out);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout.len(), 1_048_576);
    assert_eq!(result.stderr.len(), 1_048_576);
    assert!(result.stdout.bytes().all(|b| b == b'a'));
    assert_eq!(result.stdout_dropped_bytes, 0);
}

#[tokio::test]
async fn test_env_and_cwd_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let result = executor()
        .execute(
            &sh("echo \"$QCHECK_MARKER\"; pwd -P")
                .with_env("QCHECK_MARKER", "hello")
                .with_cwd(dir.path()),
        )
        .await
        .unwrap();
    let mut lines = result.stdout.lines();
    assert_eq!(lines.next(), Some("hello"));
    let cwd = std::fs::canonicalize(dir.path()).unwrap();
    assert_eq!(lines.next(), Some(cwd.to_str().unwrap()));
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let exec = executor();
    let slow = sh("sleep 10").with_timeout_secs(1);
    let fast = sh("echo quick");
    let (slow, fast) = tokio::join!(exec.execute(&slow), exec.execute(&fast));
    let (slow, fast) = (slow.unwrap(), fast.unwrap());
    assert!(slow.timed_out);
    assert!(!fast.timed_out);
    assert_eq!(fast.stdout, "quick\n");
    assert!(fast.duration < slow.duration);
}
