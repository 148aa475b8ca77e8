//! Wall-clock sources
//!
//! Every timing fact in the crate (`start_time` of a session, `started_at`
//! of an instance) is read from a [`Clock`], so hosts use [`SystemClock`]
//! while tests drive a [`ManualClock`] forward explicitly.

use std::{fmt::Debug, time::Duration};

use parking_lot::Mutex;
use web_time::SystemTime;

/// Source of the current wall-clock instant
pub trait Clock: Debug + Send + Sync {
    /// Returns the current instant
    fn now(&self) -> SystemTime;
}

/// Clock backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Jumps the clock to `to`, which may lie in the past
    pub fn set(&self, to: SystemTime) {
        *self.now.lock() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock()
    }
}
