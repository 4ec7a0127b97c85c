use std::sync::Arc;

use chrono::Utc;

/// Millisecond wall clock used for credential expiry.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

pub type SharedClock = Arc<dyn Clock + Send + Sync>;

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use std::sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    };

    use super::Clock;

    /// Settable clock; clones share the same instant.
    #[derive(Clone, Debug, Default)]
    pub struct ManualClock {
        now: Arc<AtomicI64>,
    }

    impl ManualClock {
        pub fn at(now_ms: i64) -> Self {
            Self {
                now: Arc::new(AtomicI64::new(now_ms)),
            }
        }

        pub fn set(&self, now_ms: i64) {
            self.now.store(now_ms, Ordering::SeqCst);
        }

        pub fn advance_ms(&self, delta: i64) {
            self.now.fetch_add(delta, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}
