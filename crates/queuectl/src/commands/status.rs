use std::path::Path;

pub async fn status(db_path: &Path) -> anyhow::Result<()> {
    let (repository, _config) = super::open(db_path).await?;
    let status = repository.queue_status().await?;

    println!("pending:    {}", status.pending);
    println!("processing: {}", status.processing);
    println!("completed:  {}", status.completed);
    println!("dead:       {}", status.dead);
    Ok(())
}
