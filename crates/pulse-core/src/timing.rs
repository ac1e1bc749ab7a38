//! Poll intervals and deadlines for each waiting phase.
//!
//! The defaults are the values the firmware was tuned against. They are
//! plain data so a host can load its own from configuration without the
//! protocol logic changing.

use std::time::Duration;

/// Interval between single-byte polls while waiting for `Waiting`.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Number of ready polls before the operator is asked to override (~10 s).
pub const READY_POLL_ATTEMPTS: u32 = 100;

/// Pause after writing a frame before listening for the echo.
pub const SETTLE_DELAY: Duration = Duration::from_millis(90);

/// Interval between reads while accumulating the echo.
pub const ECHO_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Absolute deadline for the full 4-byte echo.
pub const ECHO_TIMEOUT: Duration = Duration::from_secs(2);

/// Interval between status polls after `Ack`.
pub const COMPLETION_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Absolute deadline for `Success`/`Error` after `Ack`.
pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// Timing policy for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub ready_poll_interval: Duration,
    pub ready_poll_attempts: u32,
    pub settle_delay: Duration,
    pub echo_poll_interval: Duration,
    pub echo_timeout: Duration,
    pub completion_poll_interval: Duration,
    pub completion_timeout: Duration,

    /// Discard input once more after the settle delay, before reading
    /// the echo. Drops `Waiting` bytes the device emitted while it had
    /// not yet seen the frame, but loses an echo that arrives early.
    pub flush_after_settle: bool,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            ready_poll_interval: READY_POLL_INTERVAL,
            ready_poll_attempts: READY_POLL_ATTEMPTS,
            settle_delay: SETTLE_DELAY,
            echo_poll_interval: ECHO_POLL_INTERVAL,
            echo_timeout: ECHO_TIMEOUT,
            completion_poll_interval: COMPLETION_POLL_INTERVAL,
            completion_timeout: COMPLETION_TIMEOUT,
            flush_after_settle: false,
        }
    }
}

impl Timing {
    /// Upper bound on how long the ready wait can take.
    pub fn ready_budget(&self) -> Duration {
        self.ready_poll_interval * self.ready_poll_attempts
    }
}
