use thiserror::Error;

/// Errors surfaced by the job repository and config store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("job id already exists: {0}")]
    DuplicateId(String),

    #[error("no such job or dlq entry: {0}")]
    NotFound(String),

    #[error("invalid job state in storage: {0}")]
    InvalidState(String),

    #[error("invalid timestamp in storage: {0} ({1})")]
    InvalidTimestamp(String, String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the external process executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to spawn command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("command exited with status {0}")]
    NonZeroExit(i32),

    #[error("command terminated by signal")]
    Signaled,

    #[error("command was cancelled")]
    Cancelled,
}

pub type Result<T, E = RepositoryError> = std::result::Result<T, E>;
