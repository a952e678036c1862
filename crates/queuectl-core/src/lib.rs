//! Durable job queue core for queuectl.
//!
//! This crate owns the claim/execute/retry state machine and its SQLite
//! persistence contract: atomic single-row claims under concurrent workers,
//! the retry-or-graveyard decision with exponential backoff, dead-letter
//! queue movement and recovery, and scheduled-visibility (`available_at`)
//! semantics. The CLI front-end is a thin adapter over this crate.

pub mod clock;
pub mod config;
pub mod error;
pub mod executor;
pub mod job;
pub mod repository;
pub mod stop_signal;
pub mod store;
pub mod worker;

pub use clock::{Clock, SystemClock, TestClock};
pub use config::ConfigStore;
pub use error::{ExecutorError, RepositoryError, Result};
pub use executor::ProcessExecutor;
pub use job::{DlqRecord, Job, JobState, NewJob};
pub use repository::{JobRepository, QueueStatus};
pub use stop_signal::{StopSignal, STOP_FILE_NAME};
pub use store::Store;
pub use worker::{Worker, WorkerConfig};
