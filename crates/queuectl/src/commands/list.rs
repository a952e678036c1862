use std::path::Path;
use std::str::FromStr;

use clap::Args;
use queuectl_core::JobState;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show jobs in this state (pending, processing, completed)
    #[arg(long)]
    state: Option<String>,
}

pub async fn list(db_path: &Path, args: ListArgs) -> anyhow::Result<()> {
    let (repository, _config) = super::open(db_path).await?;

    let state = args
        .state
        .as_deref()
        .map(JobState::from_str)
        .transpose()?;

    let jobs = repository.list_jobs(state).await?;
    if jobs.is_empty() {
        println!("no jobs");
        return Ok(());
    }

    for job in jobs {
        println!(
            "{}\t{}\t{}\tattempts={}/{}\tavailable_at={}\tcommand={}",
            job.id, job.state, job.updated_at, job.attempts, job.max_retries, job.available_at, job.command
        );
    }
    Ok(())
}
