//! Time source used for every poll interval and deadline.

use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time plus a way to wait.
///
/// The runner never calls `Instant::now()` or `thread::sleep` directly,
/// so tests can drive it on virtual time (see [`crate::sim::ManualClock`]).
pub trait Clock {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration);
}

/// Wall-clock time, blocking the calling thread on `sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}
