//! Elapsed and remaining clocks
//!
//! Both clocks are projections: the only stored facts are the session's
//! `start_time` and an instance's `started_at`. Everything here is
//! recomputed from those and the current instant on every refresh tick.

use std::{fmt::Display, time::Duration};

use serde::Serialize;
use web_time::SystemTime;

/// Time since `since`, or zero if the clock stepped backwards
pub fn elapsed(since: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(since).unwrap_or_default()
}

/// Time left of `limit` after starting at `started_at`, floored at zero
pub fn remaining(limit: Duration, started_at: SystemTime, now: SystemTime) -> Duration {
    limit.saturating_sub(elapsed(started_at, now))
}

/// Formats whole minutes and seconds as `MM:SS`
pub fn format_mm_ss(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Formats whole hours, minutes and seconds as `HH:MM:SS`
pub fn format_hh_mm_ss(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

/// The admin's view of the session clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AdminTimer {
    /// No session is running
    Inactive,
    /// A session has been running for this long
    Elapsed(Duration),
}

impl AdminTimer {
    /// Projects the admin clock from the session start time
    pub fn new(start_time: Option<SystemTime>, now: SystemTime) -> Self {
        start_time.map_or(Self::Inactive, |start| Self::Elapsed(elapsed(start, now)))
    }
}

impl Display for AdminTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inactive => f.write_str("Quiz Inactive"),
            Self::Elapsed(elapsed) => f.write_str(&format_mm_ss(*elapsed)),
        }
    }
}

/// A participant's view of their own countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParticipantTimer {
    /// Not joined yet
    Waiting,
    /// Answering, with this much time left
    Remaining(Duration),
    /// The countdown reached zero
    TimesUp,
    /// The attempt has been submitted
    Finished,
}

impl ParticipantTimer {
    /// Projects the countdown of a joined, unsubmitted instance
    pub fn running(limit: Duration, started_at: SystemTime, now: SystemTime) -> Self {
        match remaining(limit, started_at, now) {
            Duration::ZERO => Self::TimesUp,
            left => Self::Remaining(left),
        }
    }

    /// Checks if the countdown has run out
    pub fn is_times_up(&self) -> bool {
        matches!(self, Self::TimesUp)
    }
}

impl Display for ParticipantTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => f.write_str("Waiting..."),
            Self::Remaining(left) => f.write_str(&format_mm_ss(*left)),
            Self::TimesUp => f.write_str("Time's Up!"),
            Self::Finished => f.write_str("Finished!"),
        }
    }
}
