use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::error::{RepositoryError, Result};
use crate::job::{
    format_timestamp, parse_timestamp, DlqRecord, DlqRow, Job, JobRow, JobState, NewJob,
};
use crate::store::Store;

/// Per-state job counts, as returned by `queue_status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatus {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    /// Synthesized from the `dlq` table's row count — see DESIGN.md Open
    /// Question decisions. `jobs.state` never actually holds `'dead'`.
    pub dead: i64,
}

/// The sole mutator of job state. Every method owns one invariant from the
/// spec's data model; see the module-level doc comments on each method.
#[derive(Debug, Clone)]
pub struct JobRepository {
    store: Store,
}

impl JobRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Insert a new job. Any unset timestamp defaults to `now`; unset state
    /// defaults to `pending`; `max_retries` of zero or unset defaults to 3.
    /// Fails with `DuplicateId` if the id already exists.
    pub async fn enqueue(&self, job: NewJob, now: DateTime<Utc>) -> Result<()> {
        let created_at = job.created_at.unwrap_or(now);
        let updated_at = job.updated_at.unwrap_or(now);
        let available_at = job.available_at.unwrap_or(now);
        let state = job.state.unwrap_or(JobState::Pending);
        let max_retries = match job.max_retries {
            Some(0) | None => 3,
            Some(n) => n,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, command, state, attempts, max_retries, created_at, updated_at, available_at)
            VALUES (?, ?, ?, 0, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.command)
        .bind(state.as_str())
        .bind(max_retries)
        .bind(format_timestamp(created_at))
        .bind(format_timestamp(updated_at))
        .bind(format_timestamp(available_at))
        .execute(&self.store.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(RepositoryError::DuplicateId(job.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically claim the single oldest eligible pending job.
    ///
    /// Select-then-conditional-update CAS: SQLite has no `FOR UPDATE SKIP
    /// LOCKED`, so an exclusive transaction plus an `UPDATE ... WHERE
    /// state='pending'` guard reproduces the same at-most-one-claimant
    /// guarantee. Returns `None` if no row is eligible or a concurrent
    /// claimant won the race.
    pub async fn claim_one(&self, now: DateTime<Utc>) -> Result<Option<Job>> {
        let mut conn = self.store.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let selected: Option<String> = match sqlx::query_scalar(
            r#"
            SELECT id FROM jobs
            WHERE state = 'pending' AND available_at <= ?
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(format_timestamp(now))
        .fetch_optional(&mut *conn)
        .await
        {
            Ok(id) => id,
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e.into());
            }
        };

        let Some(id) = selected else {
            sqlx::query("ROLLBACK").execute(&mut *conn).await?;
            return Ok(None);
        };

        let update_result = sqlx::query(
            r#"
            UPDATE jobs SET state = 'processing', updated_at = ?
            WHERE id = ? AND state = 'pending'
            "#,
        )
        .bind(format_timestamp(now))
        .bind(&id)
        .execute(&mut *conn)
        .await;

        let rows_affected = match update_result {
            Ok(r) => r.rows_affected(),
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e.into());
            }
        };

        if rows_affected != 1 {
            // Lost the race to another claimant.
            sqlx::query("ROLLBACK").execute(&mut *conn).await?;
            return Ok(None);
        }

        let row: JobRow = match sqlx::query_as(
            r#"
            SELECT id, command, state, attempts, max_retries, created_at, updated_at, available_at
            FROM jobs WHERE id = ?
            "#,
        )
        .bind(&id)
        .fetch_one(&mut *conn)
        .await
        {
            Ok(row) => row,
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e.into());
            }
        };

        sqlx::query("COMMIT").execute(&mut *conn).await?;

        Ok(Some(row.try_into()?))
    }

    /// Mark a claimed job completed. Zero rows affected (the job was reset
    /// or externally deleted) is not an error: the worker already did the
    /// work, and the operation is idempotent with respect to later calls.
    pub async fn complete(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs SET state = 'completed', updated_at = ?
            WHERE id = ? AND state = 'processing'
            "#,
        )
        .bind(format_timestamp(now))
        .bind(id)
        .execute(&self.store.pool)
        .await?;
        Ok(())
    }

    /// Decide retry vs. dead-letter after a failed execution.
    ///
    /// Returns `true` if the job was moved to the DLQ, `false` if it was
    /// rescheduled with exponential backoff (`delay = min(base^attempts,
    /// cap_seconds)` seconds, truncated).
    pub async fn fail_retry(
        &self,
        job: &Job,
        now: DateTime<Utc>,
        base: i64,
        cap_seconds: i64,
        err: &str,
    ) -> Result<bool> {
        let new_attempts = job.attempts + 1;

        if new_attempts >= job.max_retries {
            let mut tx = self.store.pool.begin().await?;

            sqlx::query(
                r#"
                INSERT INTO dlq (id, command, attempts, max_retries, last_error, failed_at, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&job.id)
            .bind(&job.command)
            .bind(new_attempts)
            .bind(job.max_retries)
            .bind(err)
            .bind(format_timestamp(now))
            .bind(format_timestamp(job.created_at))
            .bind(format_timestamp(now))
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM jobs WHERE id = ?")
                .bind(&job.id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            return Ok(true);
        }

        let delay_seconds = saturating_backoff(base, new_attempts).min(cap_seconds.max(0));
        let available_at = now + chrono::Duration::seconds(delay_seconds);

        sqlx::query(
            r#"
            UPDATE jobs
            SET attempts = ?, state = 'pending', available_at = ?, updated_at = ?
            WHERE id = ? AND state = 'processing'
            "#,
        )
        .bind(new_attempts)
        .bind(format_timestamp(available_at))
        .bind(format_timestamp(now))
        .bind(&job.id)
        .execute(&self.store.pool)
        .await?;

        Ok(false)
    }

    /// Jobs in the dead-letter queue, most recently failed first.
    pub async fn list_dlq(&self) -> Result<Vec<DlqRecord>> {
        let rows: Vec<DlqRow> = sqlx::query_as(
            r#"
            SELECT id, command, attempts, max_retries, last_error, failed_at, created_at, updated_at
            FROM dlq
            ORDER BY failed_at DESC
            "#,
        )
        .fetch_all(&self.store.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// All jobs, optionally filtered to a single state.
    pub async fn list_jobs(&self, state: Option<JobState>) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = match state {
            Some(state) => {
                sqlx::query_as(
                    r#"
                    SELECT id, command, state, attempts, max_retries, created_at, updated_at, available_at
                    FROM jobs WHERE state = ?
                    "#,
                )
                .bind(state.as_str())
                .fetch_all(&self.store.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT id, command, state, attempts, max_retries, created_at, updated_at, available_at
                    FROM jobs
                    "#,
                )
                .fetch_all(&self.store.pool)
                .await?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Counts per state across `{pending, processing, completed, dead}`.
    pub async fn queue_status(&self) -> Result<QueueStatus> {
        let mut status = QueueStatus::default();

        for (state, target) in [
            (JobState::Pending, &mut status.pending),
            (JobState::Processing, &mut status.processing),
            (JobState::Completed, &mut status.completed),
        ] {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE state = ?")
                .bind(state.as_str())
                .fetch_one(&self.store.pool)
                .await?;
            *target = count;
        }

        status.dead = sqlx::query_scalar("SELECT COUNT(*) FROM dlq")
            .fetch_one(&self.store.pool)
            .await?;

        Ok(status)
    }

    /// Move a DLQ entry back into `jobs` with `attempts=0`, `state=pending`.
    /// Fails with `NotFound` if no DLQ row matches `id`.
    pub async fn retry_dlq(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let mut tx = self.store.pool.begin().await?;

        let row = sqlx::query(
            "SELECT command, max_retries, created_at FROM dlq WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(RepositoryError::NotFound(id.to_string()));
        };

        let command: String = row.try_get("command")?;
        let max_retries: i64 = row.try_get("max_retries")?;
        let created_at: String = row.try_get("created_at")?;
        // Re-parse and reformat so a DLQ row written before a format change
        // cannot propagate a malformed timestamp into `jobs`.
        let created_at = parse_timestamp(&created_at)?;

        sqlx::query(
            r#"
            INSERT INTO jobs (id, command, state, attempts, max_retries, created_at, updated_at, available_at)
            VALUES (?, ?, 'pending', 0, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&command)
        .bind(max_retries)
        .bind(format_timestamp(created_at))
        .bind(format_timestamp(now))
        .bind(format_timestamp(now))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM dlq WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Truncate `jobs`. Administrative only; preserves schema.
    pub async fn reset_queue(&self) -> Result<()> {
        sqlx::query("DELETE FROM jobs")
            .execute(&self.store.pool)
            .await?;
        Ok(())
    }

    /// Truncate `dlq`. Administrative only; preserves schema.
    pub async fn reset_dlq(&self) -> Result<()> {
        sqlx::query("DELETE FROM dlq")
            .execute(&self.store.pool)
            .await?;
        Ok(())
    }
}

/// `base^attempts`, saturating rather than overflowing for pathological
/// configs (e.g. `base=10, attempts=30`). The cap is applied by the caller.
fn saturating_backoff(base: i64, attempts: i64) -> i64 {
    if attempts <= 0 {
        return 1;
    }
    let base = base.max(1) as u32;
    let mut result: i64 = 1;
    for _ in 0..attempts {
        result = result.saturating_mul(base as i64);
    }
    result
}
