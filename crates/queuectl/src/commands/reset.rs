use std::path::Path;

pub async fn reset(db_path: &Path) -> anyhow::Result<()> {
    let (repository, _config) = super::open(db_path).await?;
    repository.reset_queue().await?;
    repository.reset_dlq().await?;
    println!("queue and dlq cleared");
    Ok(())
}
