//! Configuration constants for the quiz session core
//!
//! This module contains the limits, defaults and refresh periods used
//! throughout the crate so that validation and display agree on the
//! same boundaries.

/// Session configuration constants
pub mod session {
    /// Title used until the admin saves a configuration
    pub const DEFAULT_TITLE: &str = "WARP Quiz";
    /// Maximum length of a quiz title in characters
    pub const MAX_TITLE_LENGTH: usize = 200;
    /// Question count used until the admin saves a configuration
    pub const DEFAULT_QUESTION_COUNT: usize = 10;
    /// Minimum number of questions drawn for a session
    pub const MIN_QUESTION_COUNT: usize = 1;
    /// Duration in minutes used until the admin saves a configuration
    pub const DEFAULT_DURATION_MINUTES: u64 = 15;
    /// Minimum time a participant gets, in minutes
    pub const MIN_DURATION_MINUTES: u64 = 1;
    /// Maximum time a participant gets, in minutes
    pub const MAX_DURATION_MINUTES: u64 = 120;
}

/// Participant constants
pub mod participant {
    /// Maximum length of a participant name in characters
    pub const MAX_NAME_LENGTH: usize = 30;
}

/// Question bank constants
pub mod bank {
    /// Number of columns every data row carries
    pub const COLUMN_COUNT: usize = 6;
    /// Column names, in the order used when the upload has no header row
    pub const COLUMNS: [&str; COLUMN_COUNT] = [
        "question_id",
        "question_text",
        "difficulty",
        "option_id",
        "option_text",
        "is_correct",
    ];
}

/// Leaderboard constants
pub mod leaderboard {
    /// Maximum number of ranked rows shipped in a view
    pub const VIEW_LIMIT: usize = 50;
    /// Header row of the CSV export
    ///
    /// `Finished At` is written in UTC so exports do not depend on the
    /// host's time zone.
    pub const CSV_HEADER: [&str; 5] = ["Participant", "Score", "Total", "Time Taken", "Finished At"];
}

/// Refresh periods for the two clocks
pub mod tick {
    use std::time::Duration;

    /// Participant countdown refresh period
    pub const PARTICIPANT: Duration = Duration::from_secs(1);
    /// Admin elapsed-clock refresh period
    pub const ADMIN: Duration = Duration::from_secs(5);
}
