//! CLI argument parsing

use crate::commands::{self, DlqArgs, EnqueueArgs, ListArgs, WorkerArgs};
use clap::{Parser, Subcommand};

/// queuectl - a durable, SQLite-backed job queue.
#[derive(Parser, Debug)]
#[command(name = "queuectl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the SQLite database file. Overrides `QUEUECTL_DB`.
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a job to the queue
    Enqueue(EnqueueArgs),

    /// List jobs, optionally filtered by state
    List(ListArgs),

    /// Show per-state job counts
    Status,

    /// Manage the worker process
    #[command(subcommand)]
    Worker(WorkerArgs),

    /// Inspect and recover dead-lettered jobs
    #[command(subcommand)]
    Dlq(DlqArgs),

    /// Read or write runtime configuration
    #[command(subcommand)]
    Config(commands::ConfigArgs),

    /// Truncate both the job queue and the dead-letter queue
    Reset,
}

impl Cli {
    pub async fn execute(self) -> anyhow::Result<()> {
        let db_path = commands::resolve_db_path(self.db);

        match self.command {
            Commands::Enqueue(args) => commands::enqueue(&db_path, args).await,
            Commands::List(args) => commands::list(&db_path, args).await,
            Commands::Status => commands::status(&db_path).await,
            Commands::Worker(args) => commands::worker(&db_path, args).await,
            Commands::Dlq(args) => commands::dlq(&db_path, args).await,
            Commands::Config(args) => commands::config(&db_path, args).await,
            Commands::Reset => commands::reset(&db_path).await,
        }
    }
}
