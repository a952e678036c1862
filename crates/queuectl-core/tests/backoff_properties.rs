use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use queuectl_core::{JobRepository, NewJob, Store};

fn run(fut: impl std::future::Future<Output = Result<(), TestCaseError>>) -> Result<(), TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
        .block_on(fut)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever `base` and `cap` a deployment configures, a single
    /// `fail_retry` call never schedules a job further out than the cap.
    #[test]
    fn backoff_never_exceeds_cap(base in 1i64..8, cap_seconds in 1i64..120) {
        run(async move {
            let store = Store::open_in_memory().await.expect("open store");
            let repo = JobRepository::new(store);
            let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

            repo.enqueue(NewJob::new("job-1", "false").with_max_retries(1_000_000), now)
                .await
                .expect("enqueue");
            let job = repo.claim_one(now).await.expect("claim").expect("a job");

            repo.fail_retry(&job, now, base, cap_seconds, "boom")
                .await
                .expect("fail_retry");

            let jobs = repo.list_jobs(None).await.expect("list");
            let delay = jobs[0].available_at - jobs[0].updated_at;
            prop_assert!(delay.num_seconds() <= cap_seconds);
            prop_assert!(delay.num_seconds() >= 0);
            Ok(())
        })?;
    }

    /// A job whose `max_retries` is reached is always removed from `jobs`
    /// and always appears in `dlq`, regardless of the backoff configuration.
    #[test]
    fn exhausted_retries_always_land_in_dlq(max_retries in 1i64..5) {
        run(async move {
            let store = Store::open_in_memory().await.expect("open store");
            let repo = JobRepository::new(store);
            let mut now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

            repo.enqueue(NewJob::new("job-1", "false").with_max_retries(max_retries), now)
                .await
                .expect("enqueue");

            let mut moved = false;
            for _ in 0..max_retries {
                let job = match repo.claim_one(now).await.expect("claim") {
                    Some(job) => job,
                    None => break,
                };
                moved = repo
                    .fail_retry(&job, now, 2, 3600, "boom")
                    .await
                    .expect("fail_retry");
                now = now + chrono::Duration::hours(2);
            }

            prop_assert!(moved, "job must reach the dlq within max_retries attempts");
            prop_assert!(repo.list_jobs(None).await.expect("list").is_empty());
            prop_assert_eq!(repo.list_dlq().await.expect("list dlq").len(), 1);
            Ok(())
        })?;
    }
}
