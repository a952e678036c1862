//! CLI commands

mod config;
mod dlq;
mod enqueue;
mod list;
mod reset;
mod status;
mod worker;

pub use config::{config, ConfigArgs};
pub use dlq::{dlq, DlqArgs};
pub use enqueue::{enqueue, EnqueueArgs};
pub use list::{list, ListArgs};
pub use reset::reset;
pub use status::status;
pub use worker::{worker, WorkerArgs};

use std::path::PathBuf;

use queuectl_core::{ConfigStore, JobRepository, Store};

const DEFAULT_DB_PATH: &str = "queue.db";
const DB_ENV_VAR: &str = "QUEUECTL_DB";

/// Resolve the database path: `--db` flag, then `QUEUECTL_DB`, then the
/// default file in the current directory.
pub fn resolve_db_path(flag: Option<String>) -> PathBuf {
    flag.map(PathBuf::from)
        .or_else(|| std::env::var_os(DB_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
}

/// Open the store and build the repository/config-store pair every command
/// needs. Each invocation of the CLI is short-lived, so there is no benefit
/// to keeping a pool open across commands.
pub async fn open(db_path: &std::path::Path) -> anyhow::Result<(JobRepository, ConfigStore)> {
    let store = Store::open(db_path).await?;
    Ok((
        JobRepository::new(store.clone()),
        ConfigStore::new(store),
    ))
}
