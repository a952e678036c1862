use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::error::ExecutorError;
use crate::executor::ProcessExecutor;
use crate::job::Job;
use crate::repository::JobRepository;
use crate::stop_signal::StopSignal;

/// Backoff policy a worker applies to every job it fails. Read once at
/// worker construction from the config store — a change takes effect on
/// the next `worker start`, not live.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub backoff_base: i64,
    pub backoff_cap_seconds: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            backoff_base: 2,
            backoff_cap_seconds: 60,
        }
    }
}

/// Drives the claim -> execute -> complete/retry loop until told to stop,
/// either via its `CancellationToken` (in-process, e.g. ctrl-c) or the
/// filesystem sentinel written by a separate `worker stop` invocation.
pub struct Worker {
    repository: JobRepository,
    executor: ProcessExecutor,
    clock: Arc<dyn Clock>,
    stop_signal: StopSignal,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        repository: JobRepository,
        clock: Arc<dyn Clock>,
        stop_signal: StopSignal,
        config: WorkerConfig,
    ) -> Self {
        Self {
            repository,
            executor: ProcessExecutor::new(),
            clock,
            stop_signal,
            config,
        }
    }

    /// Run until `cancel` fires or the stop sentinel appears. A storage
    /// error while claiming is logged and damped with a one-second sleep
    /// rather than propagated — one worker's transient storage hiccup must
    /// not crash the whole pool.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("worker starting");

        loop {
            if cancel.is_cancelled() || self.stop_signal.should_stop() {
                info!("worker stopping");
                return;
            }

            let now = self.clock.now();
            match self.repository.claim_one(now).await {
                Err(err) => {
                    error!(error = %err, "claim failed, backing off");
                    if self.sleep_or_cancel(Duration::from_secs(1), &cancel).await {
                        return;
                    }
                }
                Ok(None) => {
                    if self.sleep_or_cancel(self.idle_sleep(), &cancel).await {
                        return;
                    }
                }
                Ok(Some(job)) => {
                    info!(job_id = %job.id, attempt = job.attempts + 1, "claimed job");
                    self.settle(job, &cancel).await;
                }
            }
        }
    }

    async fn settle(&self, job: Job, cancel: &CancellationToken) {
        let outcome = self.executor.run(&job.command, cancel).await;
        let now = self.clock.now();

        match outcome {
            Ok(()) => {
                if let Err(err) = self.repository.complete(&job.id, now).await {
                    // The job really did finish; the row being stale or gone
                    // is not a failure worth surfacing.
                    warn!(job_id = %job.id, error = %err, "complete failed, ignoring");
                } else {
                    info!(job_id = %job.id, "job completed");
                }
            }
            Err(ExecutorError::Cancelled) => {
                // The token fired mid-execution and the child was killed.
                // The row stays in `processing` untouched: settling it here
                // would let a shutting-down worker decide retry/dlq outcomes
                // for work it never actually saw finish.
                warn!(job_id = %job.id, "job cancelled mid-execution, left in processing");
            }
            Err(err) => {
                let result = self
                    .repository
                    .fail_retry(
                        &job,
                        now,
                        self.config.backoff_base,
                        self.config.backoff_cap_seconds,
                        &err.to_string(),
                    )
                    .await;

                match result {
                    Ok(true) => warn!(job_id = %job.id, error = %err, "job exhausted retries, moved to dlq"),
                    Ok(false) => warn!(job_id = %job.id, error = %err, "job failed, scheduled for retry"),
                    Err(repo_err) => error!(job_id = %job.id, error = %repo_err, "fail_retry failed"),
                }
            }
        }
    }

    /// Sleep for `duration` unless `cancel` fires first. Returns `true` if
    /// the caller should stop the loop.
    async fn sleep_or_cancel(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = cancel.cancelled() => {
                info!("worker stopping");
                true
            }
        }
    }

    fn idle_sleep(&self) -> Duration {
        Duration::from_millis(fastrand::u64(200..400))
    }
}
