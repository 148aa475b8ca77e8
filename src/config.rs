//! Session configuration
//!
//! The admin-editable settings of a quiz session and their validation.
//! Bounds come from [`crate::constants::session`]; the question count is
//! additionally checked against the size of the loaded bank, which is
//! passed to `garde` as validation context.

use std::time::Duration;

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::constants::session::{
    DEFAULT_DURATION_MINUTES, DEFAULT_QUESTION_COUNT, DEFAULT_TITLE, MAX_DURATION_MINUTES,
    MAX_TITLE_LENGTH, MIN_DURATION_MINUTES, MIN_QUESTION_COUNT,
};

/// Validation context: what the loaded bank can supply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankLimits {
    /// Number of distinct questions in the bank
    pub available_questions: usize,
}

/// Settings of one quiz session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[garde(context(BankLimits))]
pub struct SessionConfig {
    /// Title shown to participants
    #[garde(length(max = MAX_TITLE_LENGTH))]
    pub title: String,
    /// Number of questions drawn for each session
    #[garde(range(min = MIN_QUESTION_COUNT), custom(within_bank))]
    pub question_count: usize,
    /// Time each participant gets, in minutes
    #[garde(range(min = MIN_DURATION_MINUTES, max = MAX_DURATION_MINUTES))]
    pub duration_minutes: u64,
}

fn within_bank(value: &usize, limits: &BankLimits) -> garde::Result {
    if *value <= limits.available_questions {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "only {} questions are available",
            limits.available_questions
        )))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_owned(),
            question_count: DEFAULT_QUESTION_COUNT,
            duration_minutes: DEFAULT_DURATION_MINUTES,
        }
    }
}

impl SessionConfig {
    /// Creates a configuration
    pub fn new(title: impl Into<String>, question_count: usize, duration_minutes: u64) -> Self {
        Self {
            title: title.into(),
            question_count,
            duration_minutes,
        }
    }

    /// The time each participant gets
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_minutes * 60)
    }

    /// Lowers the question count to what the bank can supply
    #[must_use]
    pub fn clamped_to(mut self, available_questions: usize) -> Self {
        self.question_count = self.question_count.min(available_questions);
        self
    }
}
