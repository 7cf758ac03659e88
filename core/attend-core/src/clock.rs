//! Time source for poll loops.
//!
//! Every wait in the crate goes through a `Clock` so tests can run the
//! workflows against virtual time.

use std::thread;
use std::time::{Duration, Instant};

use crate::config::RetryPolicy;

pub trait Clock {
    fn sleep(&self, duration: Duration);
    fn now(&self) -> Instant;
}

/// Wall clock backed by `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Runs `probe` up to `policy.attempts` times, sleeping `policy.interval`
/// before each attempt. Returns the first `Some`.
pub fn poll<T>(
    clock: &dyn Clock,
    policy: RetryPolicy,
    mut probe: impl FnMut(u32) -> Option<T>,
) -> Option<T> {
    for attempt in 0..policy.attempts {
        clock.sleep(policy.interval);
        if let Some(value) = probe(attempt) {
            return Some(value);
        }
    }
    None
}
