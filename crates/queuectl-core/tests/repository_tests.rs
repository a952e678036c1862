use std::sync::Arc;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use queuectl_core::{JobRepository, JobState, NewJob, Store};

async fn repo() -> JobRepository {
    let store = Store::open_in_memory().await.expect("open in-memory store");
    JobRepository::new(store)
}

#[tokio::test]
async fn enqueue_defaults_to_pending_and_immediately_available() {
    let repo = repo().await;
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

    repo.enqueue(NewJob::new("job-1", "echo hi"), now)
        .await
        .expect("enqueue");

    let jobs = repo.list_jobs(None).await.expect("list");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].state, JobState::Pending);
    assert_eq!(jobs[0].attempts, 0);
    assert_eq!(jobs[0].max_retries, 3);
    assert_eq!(jobs[0].available_at, now);
}

#[tokio::test]
async fn enqueue_rejects_duplicate_id() {
    let repo = repo().await;
    let now = Utc::now();

    repo.enqueue(NewJob::new("dup", "echo hi"), now)
        .await
        .expect("first enqueue succeeds");

    let err = repo
        .enqueue(NewJob::new("dup", "echo bye"), now)
        .await
        .expect_err("second enqueue must fail");

    assert!(matches!(err, queuectl_core::RepositoryError::DuplicateId(id) if id == "dup"));
}

#[tokio::test]
async fn claim_one_skips_jobs_not_yet_available() {
    let repo = repo().await;
    let now = Utc::now();
    let future = now + ChronoDuration::hours(1);

    repo.enqueue(
        NewJob::new("future-job", "echo later").with_available_at(future),
        now,
    )
    .await
    .expect("enqueue");

    let claimed = repo.claim_one(now).await.expect("claim");
    assert!(claimed.is_none(), "job scheduled in the future must not be claimable yet");

    let claimed = repo.claim_one(future).await.expect("claim at availability time");
    assert!(claimed.is_some());
}

#[tokio::test]
async fn claim_one_transitions_pending_to_processing_and_is_exclusive() {
    let repo = repo().await;
    let now = Utc::now();
    repo.enqueue(NewJob::new("job-1", "echo hi"), now)
        .await
        .expect("enqueue");

    let claimed = repo.claim_one(now).await.expect("claim").expect("a job");
    assert_eq!(claimed.id, "job-1");
    assert_eq!(claimed.state, JobState::Processing);

    let second = repo.claim_one(now).await.expect("claim again");
    assert!(second.is_none(), "already-claimed job must not be claimable again");
}

#[tokio::test]
async fn claim_one_orders_by_creation_time() {
    let repo = repo().await;
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let t1 = t0 + ChronoDuration::seconds(1);

    repo.enqueue(NewJob::new("second", "echo 2"), t1)
        .await
        .expect("enqueue second");
    repo.enqueue(NewJob::new("first", "echo 1"), t0)
        .await
        .expect("enqueue first");

    let claimed = repo.claim_one(t1).await.expect("claim").expect("a job");
    assert_eq!(claimed.id, "first");
}

#[tokio::test]
async fn complete_only_affects_processing_jobs() {
    let repo = repo().await;
    let now = Utc::now();
    repo.enqueue(NewJob::new("job-1", "echo hi"), now)
        .await
        .expect("enqueue");

    repo.complete("job-1", now).await.expect("complete no-op");
    let jobs = repo.list_jobs(None).await.expect("list");
    assert_eq!(jobs[0].state, JobState::Pending, "completing a non-processing job is a no-op");

    repo.claim_one(now).await.expect("claim").expect("a job");
    repo.complete("job-1", now).await.expect("complete");
    let jobs = repo.list_jobs(None).await.expect("list");
    assert_eq!(jobs[0].state, JobState::Completed);
}

#[tokio::test]
async fn fail_retry_reschedules_with_exponential_backoff() {
    let repo = repo().await;
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    repo.enqueue(
        NewJob::new("job-1", "false").with_max_retries(5),
        now,
    )
    .await
    .expect("enqueue");

    let job = repo.claim_one(now).await.expect("claim").expect("a job");
    let moved = repo
        .fail_retry(&job, now, 2, 60, "exit 1")
        .await
        .expect("fail_retry");
    assert!(!moved, "job has retries remaining");

    let jobs = repo.list_jobs(None).await.expect("list");
    let job = &jobs[0];
    assert_eq!(job.state, JobState::Pending);
    assert_eq!(job.attempts, 1);
    // base=2, attempts=1 -> 2^1 = 2s delay.
    assert_eq!(job.available_at, now + ChronoDuration::seconds(2));
}

#[tokio::test]
async fn fail_retry_caps_backoff_delay() {
    let repo = repo().await;
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    repo.enqueue(
        NewJob::new("job-1", "false").with_max_retries(20),
        start,
    )
    .await
    .expect("enqueue");

    let mut job = repo.claim_one(start).await.expect("claim").expect("a job");
    let mut last_fail_time = start;
    for _ in 0..9 {
        repo.fail_retry(&job, last_fail_time, 2, 60, "exit 1")
            .await
            .expect("fail_retry");
        let reclaim_time = last_fail_time + ChronoDuration::seconds(61);
        job = repo
            .claim_one(reclaim_time)
            .await
            .expect("re-claim")
            .expect("job still pending");
        last_fail_time = reclaim_time;
    }

    // 2^10 = 1024s, which must have been capped to 60s.
    repo.fail_retry(&job, last_fail_time, 2, 60, "exit 1")
        .await
        .expect("final fail_retry");
    let job = repo
        .list_jobs(None)
        .await
        .expect("list")
        .into_iter()
        .next()
        .expect("job still present");
    let delay = job.available_at - job.updated_at;
    assert_eq!(delay, ChronoDuration::seconds(60));
}

#[tokio::test]
async fn fail_retry_moves_job_to_dlq_after_exhausting_retries() {
    let repo = repo().await;
    let now = Utc::now();
    repo.enqueue(
        NewJob::new("job-1", "false").with_max_retries(1),
        now,
    )
    .await
    .expect("enqueue");

    let job = repo.claim_one(now).await.expect("claim").expect("a job");
    let moved = repo
        .fail_retry(&job, now, 2, 60, "boom")
        .await
        .expect("fail_retry");
    assert!(moved, "single-retry job must move straight to dlq");

    let jobs = repo.list_jobs(None).await.expect("list");
    assert!(jobs.is_empty(), "job must be removed from the active table");

    let dlq = repo.list_dlq().await.expect("list dlq");
    assert_eq!(dlq.len(), 1);
    assert_eq!(dlq[0].id, "job-1");
    assert_eq!(dlq[0].last_error, "boom");
}

#[tokio::test]
async fn retry_dlq_reinserts_job_pending_with_attempts_reset() {
    let repo = repo().await;
    let now = Utc::now();
    repo.enqueue(
        NewJob::new("job-1", "false").with_max_retries(1),
        now,
    )
    .await
    .expect("enqueue");
    let job = repo.claim_one(now).await.expect("claim").expect("a job");
    repo.fail_retry(&job, now, 2, 60, "boom")
        .await
        .expect("fail_retry");

    let later = now + ChronoDuration::minutes(5);
    repo.retry_dlq("job-1", later).await.expect("retry_dlq");

    assert!(repo.list_dlq().await.expect("list dlq").is_empty());
    let jobs = repo.list_jobs(None).await.expect("list");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].attempts, 0);
    assert_eq!(jobs[0].state, JobState::Pending);
    assert_eq!(jobs[0].available_at, later);
}

#[tokio::test]
async fn retry_dlq_missing_id_is_not_found() {
    let repo = repo().await;
    let err = repo
        .retry_dlq("nope", Utc::now())
        .await
        .expect_err("missing dlq entry must error");
    assert!(matches!(err, queuectl_core::RepositoryError::NotFound(_)));
}

#[tokio::test]
async fn queue_status_counts_each_state_including_dead() {
    let repo = repo().await;
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let t1 = t0 + ChronoDuration::seconds(1);
    let t2 = t0 + ChronoDuration::seconds(2);

    repo.enqueue(NewJob::new("d", "false").with_max_retries(1), t0)
        .await
        .unwrap();
    repo.enqueue(NewJob::new("c", "true"), t1).await.unwrap();
    repo.enqueue(NewJob::new("p", "true"), t2).await.unwrap();

    let claimed_d = repo.claim_one(t2).await.unwrap().unwrap();
    assert_eq!(claimed_d.id, "d");
    repo.fail_retry(&claimed_d, t2, 2, 60, "boom").await.unwrap();

    let claimed_c = repo.claim_one(t2).await.unwrap().unwrap();
    assert_eq!(claimed_c.id, "c");
    repo.complete(&claimed_c.id, t2).await.unwrap();

    let status = repo.queue_status().await.unwrap();
    assert_eq!(status.pending, 1, "p was never claimed");
    assert_eq!(status.processing, 0);
    assert_eq!(status.completed, 1);
    assert_eq!(status.dead, 1);
}

#[tokio::test]
async fn reset_queue_and_reset_dlq_truncate_independently() {
    let repo = repo().await;
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let t1 = t0 + ChronoDuration::seconds(1);
    repo.enqueue(NewJob::new("b", "false").with_max_retries(1), t0)
        .await
        .unwrap();
    repo.enqueue(NewJob::new("a", "true"), t1).await.unwrap();
    let job = repo.claim_one(t1).await.unwrap().unwrap();
    assert_eq!(job.id, "b");
    repo.fail_retry(&job, t1, 2, 60, "boom").await.unwrap();

    repo.reset_queue().await.unwrap();
    assert!(repo.list_jobs(None).await.unwrap().is_empty());
    assert_eq!(repo.list_dlq().await.unwrap().len(), 1, "reset_queue must not touch dlq");

    repo.reset_dlq().await.unwrap();
    assert!(repo.list_dlq().await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_claims_never_double_claim() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("queue.db");
    let store = Store::open(&db_path).await.expect("open store");
    let repo = Arc::new(JobRepository::new(store));

    let now = Utc::now();
    for i in 0..20 {
        repo.enqueue(NewJob::new(format!("job-{i}"), "true"), now)
            .await
            .expect("enqueue");
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            let mut claimed = Vec::new();
            loop {
                match repo.claim_one(Utc::now()).await.expect("claim") {
                    Some(job) => claimed.push(job.id),
                    None => break,
                }
            }
            claimed
        }));
    }

    let mut all_claimed = Vec::new();
    for handle in handles {
        all_claimed.extend(handle.await.expect("worker task"));
    }

    all_claimed.sort();
    let mut expected: Vec<String> = (0..20).map(|i| format!("job-{i}")).collect();
    expected.sort();
    assert_eq!(all_claimed, expected, "every job must be claimed exactly once");
}
