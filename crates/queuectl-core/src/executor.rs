use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutorError;

/// Runs a job's command line as a shell invocation, the way the worker loop
/// hands work off to the OS: `sh -lc <command>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run `command` to completion, or until `cancel` fires. On
    /// cancellation the child is killed and `ExecutorError::Cancelled` is
    /// returned; the caller (the worker loop) treats that the same as any
    /// other failure for retry/DLQ purposes, except it never retries a
    /// cancelled job into a fresh backoff window mid-shutdown.
    pub async fn run(
        &self,
        command: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ExecutorError> {
        let mut child = Command::new("sh")
            .arg("-lc")
            .arg(command)
            .kill_on_drop(true)
            .spawn()
            .map_err(ExecutorError::Spawn)?;

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(ExecutorError::Spawn)?;
                match status.code() {
                    Some(0) => Ok(()),
                    Some(code) => Err(ExecutorError::NonZeroExit(code)),
                    None => Err(ExecutorError::Signaled),
                }
            }
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                Err(ExecutorError::Cancelled)
            }
        }
    }
}
