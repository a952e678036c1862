use std::path::Path;

use chrono::{DateTime, Utc};
use clap::Args;
use queuectl_core::NewJob;
use serde::Deserialize;

#[derive(Args, Debug)]
pub struct EnqueueArgs {
    /// Job descriptor as JSON: `{"id": "...", "command": "...", "max_retries": 3}`
    job_json: String,
}

#[derive(Debug, Deserialize)]
struct JobDescriptor {
    id: String,
    command: String,
    max_retries: Option<i64>,
    available_at: Option<String>,
}

pub async fn enqueue(db_path: &Path, args: EnqueueArgs) -> anyhow::Result<()> {
    let (repository, _config) = super::open(db_path).await?;

    let descriptor: JobDescriptor = serde_json::from_str(&args.job_json)?;
    let available_at: Option<DateTime<Utc>> = descriptor
        .available_at
        .as_deref()
        .map(parse_rfc3339)
        .transpose()?;

    let mut job = NewJob::new(descriptor.id.clone(), descriptor.command);
    if let Some(max_retries) = descriptor.max_retries {
        job = job.with_max_retries(max_retries);
    }
    if let Some(available_at) = available_at {
        job = job.with_available_at(available_at);
    }

    repository.enqueue(job, Utc::now()).await?;
    println!("enqueued job {}", descriptor.id);
    Ok(())
}

fn parse_rfc3339(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
