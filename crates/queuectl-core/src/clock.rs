use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Supplies the current UTC instant. Abstracted so tests can drive the
/// claim/backoff state machine without sleeping in real time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock: wall-clock UTC `now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that returns a fixed instant until manually advanced. Injected
/// into a `Worker` so backoff tests can step time deterministically instead
/// of sleeping in real time.
#[derive(Debug)]
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.now.lock().expect("test clock lock poisoned");
        *guard += delta;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("test clock lock poisoned") = now;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("test clock lock poisoned")
    }
}
