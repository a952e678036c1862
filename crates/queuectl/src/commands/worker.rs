use std::path::Path;
use std::sync::Arc;

use clap::{Args, Subcommand};
use queuectl_core::{Clock, StopSignal, SystemClock, Worker, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum WorkerArgs {
    /// Run the worker loop in the foreground until stopped
    Start(WorkerStartArgs),

    /// Signal a running worker pool to stop by writing the stop sentinel file
    Stop,
}

#[derive(Args, Debug)]
pub struct WorkerStartArgs {
    /// Number of worker tasks to run concurrently
    #[arg(long, default_value_t = 1)]
    count: u32,
}

pub async fn worker(db_path: &Path, args: WorkerArgs) -> anyhow::Result<()> {
    let stop_signal = StopSignal::beside_database(db_path);

    match args {
        WorkerArgs::Start(args) => start(db_path, stop_signal, args.count).await,
        WorkerArgs::Stop => {
            stop_signal.create()?;
            println!("stop signal written to {}", stop_signal.path().display());
            Ok(())
        }
    }
}

async fn start(db_path: &Path, stop_signal: StopSignal, count: u32) -> anyhow::Result<()> {
    // A leftover sentinel from a previous run must not prevent this one
    // from starting.
    stop_signal.remove()?;

    let (repository, config_store) = super::open(db_path).await?;
    let worker_config = WorkerConfig {
        backoff_base: config_store.backoff_base().await,
        backoff_cap_seconds: config_store.backoff_cap_seconds().await,
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received ctrl-c, shutting down worker pool");
            ctrl_c_cancel.cancel();
        }
    });

    let count = count.max(1);
    info!(count, "starting worker pool");
    let mut handles = Vec::with_capacity(count as usize);
    for id in 0..count {
        let worker = Worker::new(
            repository.clone(),
            Arc::clone(&clock),
            stop_signal.clone(),
            worker_config,
        );
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            info!(worker_id = id, "task started");
            worker.run(cancel).await;
        }));
    }

    for handle in handles {
        handle.await?;
    }

    stop_signal.remove()?;
    Ok(())
}
