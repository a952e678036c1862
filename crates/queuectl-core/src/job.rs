use chrono::{DateTime, Utc};
use std::fmt;

use crate::error::{RepositoryError, Result};

/// The state a job row can be in. `Failed` is reserved vocabulary: the
/// state-check constraint on the `jobs` table allows it, but no transition
/// in this crate ever writes it (see DESIGN.md Open Question decisions).
/// `Dead` never appears as a `jobs.state` value either — it exists only so
/// `QueueStatus` and `DlqRecord` have a name for dead-lettered jobs, which
/// physically live in the `dlq` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    Dead,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Dead => "dead",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobState {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobState::Pending),
            "processing" => Ok(JobState::Processing),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            "dead" => Ok(JobState::Dead),
            other => Err(RepositoryError::InvalidState(other.to_string())),
        }
    }
}

/// A job row as producers and workers see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub command: String,
    pub state: JobState,
    pub attempts: i64,
    pub max_retries: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub available_at: DateTime<Utc>,
}

/// Fields a producer supplies to `enqueue`. Timestamps and state are
/// optional; the repository fills defaults exactly as the source CLI's
/// `enqueue` command does.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: String,
    pub command: String,
    pub max_retries: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub available_at: Option<DateTime<Utc>>,
    pub state: Option<JobState>,
}

impl NewJob {
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            max_retries: None,
            created_at: None,
            updated_at: None,
            available_at: None,
            state: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_available_at(mut self, available_at: DateTime<Utc>) -> Self {
        self.available_at = Some(available_at);
        self
    }
}

/// A job that has exhausted its retry budget and been moved to the DLQ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlqRecord {
    pub id: String,
    pub command: String,
    pub attempts: i64,
    pub max_retries: i64,
    pub last_error: String,
    pub failed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `jobs` row as read from SQLite, before timestamp parsing.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct JobRow {
    pub id: String,
    pub command: String,
    pub state: String,
    pub attempts: i64,
    pub max_retries: i64,
    pub created_at: String,
    pub updated_at: String,
    pub available_at: String,
}

impl TryFrom<JobRow> for Job {
    type Error = RepositoryError;

    fn try_from(row: JobRow) -> Result<Self> {
        Ok(Job {
            id: row.id,
            command: row.command,
            state: row.state.parse()?,
            attempts: row.attempts,
            max_retries: row.max_retries,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            available_at: parse_timestamp(&row.available_at)?,
        })
    }
}

/// Raw `dlq` row as read from SQLite, before timestamp parsing.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct DlqRow {
    pub id: String,
    pub command: String,
    pub attempts: i64,
    pub max_retries: i64,
    pub last_error: Option<String>,
    pub failed_at: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<DlqRow> for DlqRecord {
    type Error = RepositoryError;

    fn try_from(row: DlqRow) -> Result<Self> {
        Ok(DlqRecord {
            id: row.id,
            command: row.command,
            attempts: row.attempts,
            max_retries: row.max_retries,
            last_error: row.last_error.unwrap_or_default(),
            failed_at: parse_timestamp(&row.failed_at)?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

/// Timestamps are stored as nanosecond-precision RFC-3339 strings, always UTC.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::InvalidTimestamp(s.to_string(), e.to_string()))
}
