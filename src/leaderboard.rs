//! Leaderboard of submitted attempts
//!
//! This module holds the results posted during a session, ranks them
//! for display, and exports them as CSV. Entries are immutable and only
//! ever appended; the whole board is cleared when a new session starts.

use std::time::Duration;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, TimestampSeconds, serde_as};

use super::{
    TruncatedVec,
    attempt::AttemptId,
    constants::leaderboard::CSV_HEADER,
    timer::format_hh_mm_ss,
};

/// Format of the `finished_at` column
const FINISHED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The result of one submitted attempt
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// The attempt that produced this result
    pub attempt: AttemptId,
    /// Epoch of the session the attempt was joined in
    pub session: u64,
    /// Name the participant joined with
    pub participant_name: String,
    /// Correctly answered questions
    pub score: usize,
    /// Questions presented
    pub total: usize,
    /// Time from joining to submission
    #[serde_as(as = "DurationSeconds<u64>")]
    pub duration: Duration,
    /// When the attempt was submitted
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub finished_at: DateTime<Utc>,
}

impl LeaderboardEntry {
    /// `"<score> / <total>"`
    pub fn score_label(&self) -> String {
        format!("{} / {}", self.score, self.total)
    }

    /// Duration as `HH:MM:SS`, truncated to whole seconds
    pub fn time_taken(&self) -> String {
        format_hh_mm_ss(self.duration)
    }

    /// Submission time as `YYYY-MM-DD HH:MM:SS`
    ///
    /// Always UTC, whatever the host's local zone is.
    pub fn finished_at_label(&self) -> String {
        self.finished_at.format(FINISHED_AT_FORMAT).to_string()
    }
}

/// Display projection of a ranked entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedRow {
    /// 1-based rank
    pub position: usize,
    /// Epoch of the session the attempt was joined in
    pub session: u64,
    /// Participant name
    pub participant: String,
    /// `"<score> / <total>"`
    pub score: String,
    /// `HH:MM:SS`
    pub time_taken: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub finished_at: String,
}

/// Orders entries by score descending, then duration ascending
///
/// The sort is stable, so entries that tie on both keys keep their
/// insertion order.
pub fn rank(entries: &[LeaderboardEntry]) -> Vec<&LeaderboardEntry> {
    entries
        .iter()
        .sorted_by(|a, b| b.score.cmp(&a.score).then(a.duration.cmp(&b.duration)))
        .collect_vec()
}

/// Append-only collection of results for one session
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    /// Entries in insertion order
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    /// Appends a result
    ///
    /// Never rejects and never de-duplicates: the same participant name may
    /// appear any number of times.
    pub fn push(&mut self, entry: LeaderboardEntry) {
        self.entries.push(entry);
    }

    /// Removes every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if no result has been posted
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// The entries posted by attempts joined in `session`
    pub fn for_session(&self, session: u64) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| e.session == session)
                .cloned()
                .collect(),
        }
    }

    /// Entries in rank order
    pub fn ranked(&self) -> Vec<&LeaderboardEntry> {
        rank(&self.entries)
    }

    /// Display rows in rank order
    pub fn rows(&self) -> Vec<RankedRow> {
        self.ranked_rows().collect_vec()
    }

    /// The first `limit` display rows, with the total count
    pub fn top(&self, limit: usize) -> TruncatedVec<RankedRow> {
        TruncatedVec::new(self.ranked_rows(), limit, self.entries.len())
    }

    fn ranked_rows(&self) -> impl Iterator<Item = RankedRow> + '_ {
        self.ranked()
            .into_iter()
            .enumerate()
            .map(|(i, entry)| RankedRow {
                position: i + 1,
                session: entry.session,
                participant: entry.participant_name.clone(),
                score: entry.score_label(),
                time_taken: entry.time_taken(),
                finished_at: entry.finished_at_label(),
            })
    }

    /// Exports the entries, in insertion order, as CSV
    ///
    /// # Errors
    ///
    /// Returns a `csv::Error` if writing to the in-memory buffer fails.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;
        for entry in &self.entries {
            writer.write_record([
                entry.participant_name.clone(),
                entry.score.to_string(),
                entry.total.to_string(),
                entry.time_taken(),
                entry.finished_at_label(),
            ])?;
        }
        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}
