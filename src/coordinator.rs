//! Shared session state owned by the admin
//!
//! The [`SessionCoordinator`] is the one object every connection can reach.
//! It owns the question bank, the saved configuration, the active
//! session's question set and start time, and the leaderboard. All of it
//! lives behind a single lock: each mutating operation is one critical
//! section, and readers take short read locks and leave with cheap
//! `Arc` snapshots.
//!
//! Participants never hold the lock while answering. They copy a
//! [`SessionSnapshot`] at join time and only come back to post their
//! result through [`SessionCoordinator::record_result`].

use std::{sync::Arc, time::Duration};

use garde::Validate;
use parking_lot::RwLock;
use serde::Serialize;
use serde_with::skip_serializing_none;
use thiserror::Error;
use web_time::SystemTime;

use crate::{
    TruncatedVec,
    bank::{DataIntegrityWarning, QuestionId, QuizBank},
    clock::{Clock, SystemClock},
    config::{BankLimits, SessionConfig},
    constants::leaderboard::VIEW_LIMIT,
    leaderboard::{Leaderboard, LeaderboardEntry, RankedRow},
    names::NamePolicy,
    timer::{self, AdminTimer},
};

/// Lifecycle state of the shared session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionState {
    /// No bank, or a bank without a saved configuration
    Idle,
    /// Bank loaded and configuration saved, not started
    Configured,
    /// Questions drawn and the clock running
    Active,
}

/// An action was attempted in a state that does not allow it
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// No question bank is loaded
    #[error("please upload a valid quiz file first")]
    NoBank,
    /// The loaded bank has no questions
    #[error("the loaded quiz file has no questions")]
    EmptyBank,
    /// A session is running
    #[error("a quiz is currently active")]
    SessionActive,
    /// No session is running
    #[error("the quiz is not active")]
    SessionInactive,
}

/// Errors returned by admin operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration was rejected; the previous one is kept
    #[error("invalid configuration: {0}")]
    Config(#[from] garde::Report),
    /// The operation is not allowed right now
    #[error(transparent)]
    Precondition(#[from] Precondition),
}

/// Immutable view of a running session
///
/// Participants generate their instances from, and score against, the
/// snapshot taken when they joined. A later reset, restart or bank removal
/// does not affect an attempt already in progress.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Sequence number of the session, bumped by every start
    pub epoch: u64,
    /// The bank the questions were drawn from
    pub bank: Arc<QuizBank>,
    /// The drawn question ids
    pub selected: Arc<[QuestionId]>,
    /// The configuration the session was started with
    pub config: SessionConfig,
    /// When the admin started the session
    pub start_time: SystemTime,
}

/// Everything the admin screen shows
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct AdminView {
    /// Lifecycle state
    pub state: SessionState,
    /// Configuration in effect for the next start
    pub config: SessionConfig,
    /// Distinct questions in the loaded bank
    pub available_questions: Option<usize>,
    /// Elapsed clock label
    pub timer: String,
    /// Ranked results of the latest session
    pub leaderboard: TruncatedVec<RankedRow>,
    /// How participant names are checked
    pub name_policy: NamePolicy,
    /// Answer-key problems seen while scoring
    pub warnings: Vec<String>,
}

#[derive(Debug)]
struct Inner {
    bank: Option<Arc<QuizBank>>,
    config: Option<SessionConfig>,
    active: Option<SessionSnapshot>,
    epoch: u64,
    leaderboard: Leaderboard,
    warnings: Vec<DataIntegrityWarning>,
    name_policy: NamePolicy,
    rng: fastrand::Rng,
}

impl Inner {
    fn state(&self) -> SessionState {
        match (&self.active, &self.bank, &self.config) {
            (Some(_), _, _) => SessionState::Active,
            (None, Some(_), Some(_)) => SessionState::Configured,
            _ => SessionState::Idle,
        }
    }
}

/// The shared, synchronized quiz session
#[derive(Debug)]
pub struct SessionCoordinator {
    clock: Arc<dyn Clock>,
    inner: RwLock<Inner>,
}

impl Default for SessionCoordinator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl SessionCoordinator {
    /// Creates an idle coordinator reading time from `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_rng(clock, fastrand::Rng::new())
    }

    /// Creates an idle coordinator drawing question sets from `rng`
    pub fn with_rng(clock: Arc<dyn Clock>, rng: fastrand::Rng) -> Self {
        Self {
            clock,
            inner: RwLock::new(Inner {
                bank: None,
                config: None,
                active: None,
                epoch: 0,
                leaderboard: Leaderboard::default(),
                warnings: Vec::new(),
                name_policy: NamePolicy::default(),
                rng,
            }),
        }
    }

    /// The clock all session timing is read from
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Replaces the question bank
    ///
    /// # Errors
    ///
    /// Returns [`Precondition::SessionActive`] while a session is running.
    pub fn load_bank(&self, bank: QuizBank) -> Result<(), Error> {
        let mut inner = self.inner.write();
        if inner.active.is_some() {
            return Err(Precondition::SessionActive.into());
        }
        if let Some(config) = &inner.config {
            if config.question_count > bank.len() {
                tracing::warn!(
                    question_count = config.question_count,
                    available = bank.len(),
                    "saved configuration asks for more questions than the new bank holds"
                );
            }
        }
        tracing::info!(
            questions = bank.len(),
            rows = bank.rows().len(),
            "question bank loaded"
        );
        inner.bank = Some(Arc::new(bank));
        Ok(())
    }

    /// Removes the question bank, stopping any running session
    pub fn remove_bank(&self) {
        let mut inner = self.inner.write();
        inner.bank = None;
        if inner.active.take().is_some() {
            tracing::warn!("question bank removed, quiz is now inactive");
        } else {
            tracing::info!("question bank removed");
        }
    }

    /// Validates and stores the configuration used by the next start
    ///
    /// A running session keeps the configuration it was started with.
    ///
    /// # Errors
    ///
    /// Returns [`Precondition::NoBank`] without a bank and
    /// [`Error::Config`] if the configuration is out of range; the
    /// previously saved configuration is kept in both cases.
    pub fn save_config(&self, config: SessionConfig) -> Result<(), Error> {
        let mut inner = self.inner.write();
        let bank = inner.bank.as_ref().ok_or(Precondition::NoBank)?;
        config.validate_with(&BankLimits {
            available_questions: bank.len(),
        })?;
        tracing::info!(
            title = %config.title,
            question_count = config.question_count,
            duration_minutes = config.duration_minutes,
            "configuration saved"
        );
        inner.config = Some(config);
        Ok(())
    }

    /// Starts a new session
    ///
    /// Draws the question set, clears the leaderboard, stamps the start
    /// time and marks the session active, all inside one critical section.
    /// Without a saved configuration the default one is used, capped at
    /// the size of the bank.
    ///
    /// # Errors
    ///
    /// * [`Precondition::SessionActive`] - a session is already running
    /// * [`Precondition::NoBank`] / [`Precondition::EmptyBank`] - nothing to draw from
    /// * [`Error::Config`] - the saved configuration no longer fits the bank
    pub fn start(&self) -> Result<SessionSnapshot, Error> {
        let mut inner = self.inner.write();
        if inner.active.is_some() {
            return Err(Precondition::SessionActive.into());
        }
        let bank = inner.bank.clone().ok_or(Precondition::NoBank)?;
        if bank.is_empty() {
            return Err(Precondition::EmptyBank.into());
        }
        let config = match &inner.config {
            Some(config) => config.clone(),
            None => SessionConfig::default().clamped_to(bank.len()),
        };
        config.validate_with(&BankLimits {
            available_questions: bank.len(),
        })?;

        let mut ids = bank.unique_question_ids().to_vec();
        inner.rng.shuffle(&mut ids);
        ids.truncate(config.question_count);

        inner.epoch += 1;
        inner.leaderboard.clear();
        inner.warnings.clear();

        let snapshot = SessionSnapshot {
            epoch: inner.epoch,
            bank,
            selected: ids.into(),
            config,
            start_time: self.clock.now(),
        };
        tracing::info!(
            epoch = snapshot.epoch,
            title = %snapshot.config.title,
            questions = snapshot.selected.len(),
            "quiz is now active"
        );
        inner.active = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Stops the running session
    ///
    /// The leaderboard is kept so results stay visible and exportable
    /// until the next start.
    pub fn reset(&self) {
        if let Some(session) = self.inner.write().active.take() {
            tracing::info!(epoch = session.epoch, "quiz has been reset");
        }
    }

    /// Appends a result to the leaderboard
    ///
    /// Results of an earlier session are stored too, but the views and the
    /// export only show the latest session.
    pub fn record_result(&self, entry: LeaderboardEntry) {
        let mut inner = self.inner.write();
        if entry.session == inner.epoch {
            tracing::info!(
                participant = %entry.participant_name,
                score = entry.score,
                total = entry.total,
                session = entry.session,
                "result recorded"
            );
        } else {
            tracing::warn!(
                participant = %entry.participant_name,
                session = entry.session,
                current = inner.epoch,
                "result from an earlier session recorded"
            );
        }
        inner.leaderboard.push(entry);
    }

    /// Sets how participant names are checked on join
    pub fn set_name_policy(&self, policy: NamePolicy) {
        tracing::info!(?policy, "name policy changed");
        self.inner.write().name_policy = policy;
    }

    /// How participant names are checked on join
    pub fn name_policy(&self) -> NamePolicy {
        self.inner.read().name_policy
    }

    /// Reports answer-key problems found while scoring
    pub fn report_integrity(&self, warnings: &[DataIntegrityWarning]) {
        if warnings.is_empty() {
            return;
        }
        let mut inner = self.inner.write();
        for warning in warnings {
            if !inner.warnings.contains(warning) {
                inner.warnings.push(warning.clone());
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.inner.read().state()
    }

    /// Checks if a session is running
    pub fn is_active(&self) -> bool {
        self.inner.read().active.is_some()
    }

    /// The configuration the next start will use
    pub fn config(&self) -> SessionConfig {
        let inner = self.inner.read();
        match (&inner.config, &inner.bank) {
            (Some(config), _) => config.clone(),
            (None, Some(bank)) => SessionConfig::default().clamped_to(bank.len()),
            (None, None) => SessionConfig::default(),
        }
    }

    /// The configuration explicitly saved by the admin
    pub fn saved_config(&self) -> Option<SessionConfig> {
        self.inner.read().config.clone()
    }

    /// The loaded bank
    pub fn bank(&self) -> Option<Arc<QuizBank>> {
        self.inner.read().bank.clone()
    }

    /// The running session
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.inner.read().active.clone()
    }

    /// The question ids drawn for the running session
    pub fn selected_question_ids(&self) -> Option<Arc<[QuestionId]>> {
        self.inner
            .read()
            .active
            .as_ref()
            .map(|s| Arc::clone(&s.selected))
    }

    /// Sequence number of the latest started session
    pub fn epoch(&self) -> u64 {
        self.inner.read().epoch
    }

    /// Time since the running session started
    pub fn elapsed(&self) -> Option<Duration> {
        let start_time = self.inner.read().active.as_ref().map(|s| s.start_time)?;
        Some(timer::elapsed(start_time, self.clock.now()))
    }

    /// The admin's elapsed clock
    pub fn admin_timer(&self) -> AdminTimer {
        let start_time = self.inner.read().active.as_ref().map(|s| s.start_time);
        AdminTimer::new(start_time, self.clock.now())
    }

    /// A copy of every stored result, late ones included
    pub fn leaderboard(&self) -> Leaderboard {
        self.inner.read().leaderboard.clone()
    }

    /// The results of the latest session
    pub fn standings(&self) -> Leaderboard {
        let inner = self.inner.read();
        inner.leaderboard.for_session(inner.epoch)
    }

    /// The latest session's results as CSV
    ///
    /// # Errors
    ///
    /// Returns a `csv::Error` if the export fails.
    pub fn leaderboard_csv(&self) -> Result<Vec<u8>, csv::Error> {
        self.standings().to_csv()
    }

    /// Answer-key problems seen since the session started
    pub fn integrity_warnings(&self) -> Vec<DataIntegrityWarning> {
        self.inner.read().warnings.clone()
    }

    /// Everything the admin screen shows
    pub fn admin_view(&self) -> AdminView {
        let config = self.config();
        let inner = self.inner.read();
        AdminView {
            state: inner.state(),
            config,
            available_questions: inner.bank.as_ref().map(|b| b.len()),
            timer: AdminTimer::new(
                inner.active.as_ref().map(|s| s.start_time),
                self.clock.now(),
            )
            .to_string(),
            leaderboard: inner.leaderboard.for_session(inner.epoch).top(VIEW_LIMIT),
            name_policy: inner.name_policy,
            warnings: inner.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}
