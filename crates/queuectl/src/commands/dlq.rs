use std::path::Path;

use chrono::Utc;
use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum DlqArgs {
    /// List dead-lettered jobs, most recently failed first
    List,

    /// Move a dead-lettered job back into the queue with a fresh attempt budget
    Retry(DlqRetryArgs),
}

#[derive(Args, Debug)]
pub struct DlqRetryArgs {
    /// Id of the job to requeue
    id: String,
}

pub async fn dlq(db_path: &Path, args: DlqArgs) -> anyhow::Result<()> {
    let (repository, _config) = super::open(db_path).await?;

    match args {
        DlqArgs::List => {
            let entries = repository.list_dlq().await?;
            if entries.is_empty() {
                println!("dlq is empty");
                return Ok(());
            }
            for entry in entries {
                println!(
                    "{}\tattempts={}/{}\tfailed_at={}\terror={}\tcommand={}",
                    entry.id,
                    entry.attempts,
                    entry.max_retries,
                    entry.failed_at,
                    entry.last_error,
                    entry.command
                );
            }
        }
        DlqArgs::Retry(args) => {
            repository.retry_dlq(&args.id, Utc::now()).await?;
            println!("requeued {}", args.id);
        }
    }
    Ok(())
}
