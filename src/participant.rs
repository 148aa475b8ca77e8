//! Per-connection participant state
//!
//! Each connected participant owns one [`ParticipantSession`]. It moves
//! from `NotJoined` to `Joined` (holding a personally shuffled
//! [`ParticipantInstance`]) to `Submitted`, and back to `Joined` on a
//! retake. Nothing in here is shared: the session talks to the
//! [`SessionCoordinator`] only to read a snapshot when joining and to post
//! its result when submitting.
//!
//! Submission is exactly-once per instance. Every mutating method takes
//! `&mut self`, so a connection that lets a manual click and its refresh
//! ticker race wraps the session in a [`SharedParticipant`] and both paths
//! serialize on that lock; whichever arrives second finds the instance
//! already submitted and gets [`Submission::AlreadySubmitted`].

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;
use serde_with::skip_serializing_none;
use thiserror::Error;
use web_time::SystemTime;

use crate::{
    TruncatedVec,
    attempt::AttemptId,
    bank::{OptionId, QuestionId, QuizBank},
    constants::leaderboard::VIEW_LIMIT,
    coordinator::{Precondition, SessionCoordinator, SessionSnapshot},
    leaderboard::{LeaderboardEntry, RankedRow},
    names, scorer,
    timer::{self, ParticipantTimer},
};

/// A participant session shared between a connection and its ticker
pub type SharedParticipant = Arc<parking_lot::Mutex<ParticipantSession>>;

/// Errors returned by participant operations
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The shared session does not allow this right now
    #[error(transparent)]
    Precondition(#[from] Precondition),
    /// The requested name was rejected
    #[error(transparent)]
    Name(#[from] names::Error),
    /// The participant has already joined
    #[error("already joined the quiz")]
    AlreadyJoined,
    /// The participant has not joined yet
    #[error("join the quiz first")]
    NotJoined,
    /// The attempt has been submitted and can no longer change
    #[error("this attempt has already been submitted")]
    AlreadySubmitted,
    /// Retaking requires a submitted attempt
    #[error("finish the current attempt before retaking")]
    NotSubmitted,
    /// The question is not part of this attempt
    #[error("question {0} is not part of this attempt")]
    UnknownQuestion(QuestionId),
    /// The option was not presented for the question
    #[error("option {option_id} was not presented for question {question_id}")]
    OptionNotPresented {
        /// The question being answered
        question_id: QuestionId,
        /// The rejected option
        option_id: OptionId,
    },
}

/// An option as shown to the participant, without its correctness
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentedOption {
    /// Option identifier submitted back when selected
    pub option_id: OptionId,
    /// Option text
    pub option_text: String,
}

/// A question as shown to the participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentedQuestion {
    /// Question identifier
    pub question_id: QuestionId,
    /// Question text
    pub question_text: String,
    /// Options in this participant's order
    pub options: Vec<PresentedOption>,
}

impl PresentedQuestion {
    fn presents(&self, option_id: &OptionId) -> bool {
        self.options.iter().any(|o| &o.option_id == option_id)
    }
}

/// One participant's randomized realization of a session
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantInstance {
    attempt: AttemptId,
    session: u64,
    participant_name: String,
    #[serde(skip)]
    started_at: SystemTime,
    #[serde(skip)]
    time_limit: Duration,
    questions: Vec<PresentedQuestion>,
    answers: HashMap<QuestionId, Option<OptionId>>,
    submitted: bool,
    score: usize,
    #[serde(skip)]
    bank: Arc<QuizBank>,
}

impl ParticipantInstance {
    /// Builds an instance from a session snapshot
    ///
    /// Every selected question still present in the bank is included with
    /// its options shuffled; the question order is then shuffled too.
    /// Questions missing from the bank are skipped, so the instance may
    /// hold fewer questions than the session drew.
    pub fn generate(
        participant_name: String,
        snapshot: &SessionSnapshot,
        started_at: SystemTime,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let bank = Arc::clone(&snapshot.bank);

        let mut questions = snapshot
            .selected
            .iter()
            .filter_map(|question_id| {
                let Some(question_text) = bank.question_text(question_id) else {
                    tracing::debug!(%question_id, "selected question no longer in bank, skipping");
                    return None;
                };
                let mut options = bank
                    .options_for(question_id)
                    .into_iter()
                    .map(|row| PresentedOption {
                        option_id: row.option_id.clone(),
                        option_text: row.option_text.clone(),
                    })
                    .collect_vec();
                rng.shuffle(&mut options);
                Some(PresentedQuestion {
                    question_id: question_id.clone(),
                    question_text: question_text.to_owned(),
                    options,
                })
            })
            .collect_vec();
        rng.shuffle(&mut questions);

        let answers = questions
            .iter()
            .map(|q| (q.question_id.clone(), None))
            .collect();

        Self {
            attempt: AttemptId::new(),
            session: snapshot.epoch,
            participant_name,
            started_at,
            time_limit: snapshot.config.duration(),
            questions,
            answers,
            submitted: false,
            score: 0,
            bank,
        }
    }

    /// Identifier of this attempt
    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    /// Epoch of the session this instance was generated from
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Name the participant joined with
    pub fn participant_name(&self) -> &str {
        &self.participant_name
    }

    /// When the participant joined
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// How long the participant has in total
    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    /// Questions in presentation order
    pub fn questions(&self) -> &[PresentedQuestion] {
        &self.questions
    }

    /// Selected option per presented question
    pub fn answers(&self) -> &HashMap<QuestionId, Option<OptionId>> {
        &self.answers
    }

    /// Checks if the instance has been submitted
    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Score, meaningful once submitted
    pub fn score(&self) -> usize {
        self.score
    }

    /// The bank snapshot this instance is scored against
    pub fn bank(&self) -> &QuizBank {
        &self.bank
    }

    fn question(&self, question_id: &QuestionId) -> Option<&PresentedQuestion> {
        self.questions.iter().find(|q| &q.question_id == question_id)
    }
}

/// Outcome of a submit request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Submission {
    /// The attempt was scored and posted
    Recorded(LeaderboardEntry),
    /// The attempt had already been submitted; nothing changed
    AlreadySubmitted,
}

/// Result of one refresh tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    /// The countdown as of this tick
    pub timer: ParticipantTimer,
    /// The entry posted if this tick auto-submitted
    pub auto_submitted: Option<LeaderboardEntry>,
}

/// The question currently on screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    /// 0-based position
    pub index: usize,
    /// Number of questions in the attempt
    pub count: usize,
    /// The question
    pub question: PresentedQuestion,
    /// The participant's current selection
    pub selected: Option<OptionId>,
}

/// Everything the participant screen shows
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub enum ParticipantView {
    /// Not joined
    Waiting {
        /// Quiz title
        title: String,
        /// Whether joining is currently possible
        active: bool,
    },
    /// Answering
    Answering {
        /// Quiz title
        title: String,
        /// Countdown label
        timer: String,
        /// The question on screen, if the attempt has any
        question: Option<QuestionView>,
    },
    /// Submitted
    Results {
        /// Quiz title
        title: String,
        /// Questions answered correctly
        score: usize,
        /// Questions presented
        total: usize,
        /// Ranked results
        leaderboard: TruncatedVec<RankedRow>,
    },
}

#[derive(Debug, Default)]
enum State {
    #[default]
    NotJoined,
    Joined {
        instance: ParticipantInstance,
        title: String,
        cursor: usize,
    },
    Submitted {
        instance: ParticipantInstance,
        title: String,
        entry: LeaderboardEntry,
    },
}

/// One participant connection's private state machine
#[derive(Debug)]
pub struct ParticipantSession {
    coordinator: Arc<SessionCoordinator>,
    rng: fastrand::Rng,
    state: State,
}

impl ParticipantSession {
    /// Creates a session that has not joined yet
    pub fn new(coordinator: Arc<SessionCoordinator>) -> Self {
        Self::with_rng(coordinator, fastrand::Rng::new())
    }

    /// Creates a session shuffling with `rng`
    pub fn with_rng(coordinator: Arc<SessionCoordinator>, rng: fastrand::Rng) -> Self {
        Self {
            coordinator,
            rng,
            state: State::NotJoined,
        }
    }

    /// Wraps the session for sharing with a ticker
    pub fn shared(self) -> SharedParticipant {
        Arc::new(parking_lot::Mutex::new(self))
    }

    /// Joins the running session
    ///
    /// # Errors
    ///
    /// * [`Error::AlreadyJoined`] - the session has joined before
    /// * [`Error::Name`] - the name was rejected
    /// * [`Precondition::SessionInactive`] - no session is running
    pub fn join(&mut self, name: &str) -> Result<&ParticipantInstance, Error> {
        if !matches!(self.state, State::NotJoined) {
            return Err(Error::AlreadyJoined);
        }
        let name = names::validate(name, self.coordinator.name_policy())?;
        let snapshot = self
            .coordinator
            .snapshot()
            .ok_or(Precondition::SessionInactive)?;
        tracing::debug!(participant = %name, session = snapshot.epoch, "participant joined");
        self.begin(name, &snapshot)
    }

    /// Starts a fresh attempt after a submitted one
    ///
    /// The new instance is drawn from the session running now, which may
    /// differ from the one the previous attempt belonged to.
    ///
    /// # Errors
    ///
    /// * [`Error::NotSubmitted`] - the current attempt is not submitted
    /// * [`Precondition::SessionInactive`] - no session is running
    pub fn retake(&mut self) -> Result<&ParticipantInstance, Error> {
        let State::Submitted { instance, .. } = &self.state else {
            return Err(Error::NotSubmitted);
        };
        let name = instance.participant_name.clone();
        let snapshot = self
            .coordinator
            .snapshot()
            .ok_or(Precondition::SessionInactive)?;
        tracing::debug!(participant = %name, session = snapshot.epoch, "participant retaking");
        self.begin(name, &snapshot)
    }

    fn begin(
        &mut self,
        name: String,
        snapshot: &SessionSnapshot,
    ) -> Result<&ParticipantInstance, Error> {
        let instance = ParticipantInstance::generate(
            name,
            snapshot,
            self.coordinator.clock().now(),
            &mut self.rng,
        );
        self.state = State::Joined {
            instance,
            title: snapshot.config.title.clone(),
            cursor: 0,
        };
        self.instance().ok_or(Error::NotJoined)
    }

    /// Selects an option for a question, replacing any earlier selection
    ///
    /// # Errors
    ///
    /// * [`Error::NotJoined`] / [`Error::AlreadySubmitted`] - not answering
    /// * [`Error::UnknownQuestion`] - the question is not in this attempt
    /// * [`Error::OptionNotPresented`] - the option was not shown for it
    pub fn answer(&mut self, question_id: &QuestionId, option_id: &OptionId) -> Result<(), Error> {
        let instance = match &mut self.state {
            State::NotJoined => return Err(Error::NotJoined),
            State::Submitted { .. } => return Err(Error::AlreadySubmitted),
            State::Joined { instance, .. } => instance,
        };
        let question = instance
            .question(question_id)
            .ok_or_else(|| Error::UnknownQuestion(question_id.clone()))?;
        if !question.presents(option_id) {
            return Err(Error::OptionNotPresented {
                question_id: question_id.clone(),
                option_id: option_id.clone(),
            });
        }
        instance
            .answers
            .insert(question_id.clone(), Some(option_id.clone()));
        Ok(())
    }

    /// Scores the attempt and posts it to the leaderboard
    ///
    /// Submitting an already submitted attempt changes nothing and returns
    /// [`Submission::AlreadySubmitted`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotJoined`] before joining.
    pub fn submit(&mut self) -> Result<Submission, Error> {
        match std::mem::take(&mut self.state) {
            State::NotJoined => Err(Error::NotJoined),
            submitted @ State::Submitted { .. } => {
                self.state = submitted;
                Ok(Submission::AlreadySubmitted)
            }
            State::Joined {
                mut instance,
                title,
                ..
            } => {
                let report = scorer::score(&instance, &instance.bank);
                let now = self.coordinator.clock().now();

                let entry = LeaderboardEntry {
                    attempt: instance.attempt,
                    session: instance.session,
                    participant_name: instance.participant_name.clone(),
                    score: report.score,
                    total: report.total,
                    duration: timer::elapsed(instance.started_at, now),
                    finished_at: DateTime::<Utc>::from(now),
                };

                instance.submitted = true;
                instance.score = report.score;
                self.coordinator.report_integrity(&report.warnings);
                self.coordinator.record_result(entry.clone());

                self.state = State::Submitted {
                    instance,
                    title,
                    entry: entry.clone(),
                };
                Ok(Submission::Recorded(entry))
            }
        }
    }

    /// The countdown as of now
    pub fn timer(&self) -> ParticipantTimer {
        match &self.state {
            State::NotJoined => ParticipantTimer::Waiting,
            State::Submitted { .. } => ParticipantTimer::Finished,
            State::Joined { instance, .. } => ParticipantTimer::running(
                instance.time_limit,
                instance.started_at,
                self.coordinator.clock().now(),
            ),
        }
    }

    /// Time left, while answering
    pub fn remaining(&self) -> Option<Duration> {
        match &self.state {
            State::Joined { instance, .. } => Some(timer::remaining(
                instance.time_limit,
                instance.started_at,
                self.coordinator.clock().now(),
            )),
            _ => None,
        }
    }

    /// Re-evaluates the countdown, submitting once it reaches zero
    pub fn tick(&mut self) -> Tick {
        let timer = self.timer();
        let auto_submitted = if timer.is_times_up() {
            match self.submit() {
                Ok(Submission::Recorded(entry)) => {
                    tracing::info!(
                        participant = %entry.participant_name,
                        "time's up, attempt auto-submitted"
                    );
                    Some(entry)
                }
                Ok(Submission::AlreadySubmitted) | Err(_) => None,
            }
        } else {
            None
        };
        Tick {
            timer,
            auto_submitted,
        }
    }

    /// Checks if the participant is joined and has not submitted
    pub fn is_answering(&self) -> bool {
        matches!(self.state, State::Joined { .. })
    }

    /// The current or last instance
    pub fn instance(&self) -> Option<&ParticipantInstance> {
        match &self.state {
            State::NotJoined => None,
            State::Joined { instance, .. } | State::Submitted { instance, .. } => Some(instance),
        }
    }

    /// The posted result of the last submitted attempt
    pub fn entry(&self) -> Option<&LeaderboardEntry> {
        match &self.state {
            State::Submitted { entry, .. } => Some(entry),
            _ => None,
        }
    }

    /// Index of the question on screen
    pub fn current_index(&self) -> Option<usize> {
        match &self.state {
            State::Joined { cursor, .. } => Some(*cursor),
            _ => None,
        }
    }

    /// Moves to question `index`, clamped to the attempt's questions
    pub fn go_to(&mut self, index: usize) -> Option<usize> {
        match &mut self.state {
            State::Joined {
                instance, cursor, ..
            } => {
                *cursor = index.min(instance.questions.len().saturating_sub(1));
                Some(*cursor)
            }
            _ => None,
        }
    }

    /// Moves to the next question, staying on the last one
    pub fn next(&mut self) -> Option<usize> {
        let index = self.current_index()?;
        self.go_to(index + 1)
    }

    /// Moves to the previous question, staying on the first one
    pub fn previous(&mut self) -> Option<usize> {
        let index = self.current_index()?;
        self.go_to(index.saturating_sub(1))
    }

    /// The question on screen and the participant's selection for it
    pub fn current_question(&self) -> Option<QuestionView> {
        let State::Joined {
            instance, cursor, ..
        } = &self.state
        else {
            return None;
        };
        let question = instance.questions.get(*cursor)?;
        Some(QuestionView {
            index: *cursor,
            count: instance.questions.len(),
            question: question.clone(),
            selected: instance
                .answers
                .get(&question.question_id)
                .cloned()
                .flatten(),
        })
    }

    /// Everything the participant screen shows
    pub fn view(&self) -> ParticipantView {
        match &self.state {
            State::NotJoined => ParticipantView::Waiting {
                title: self.coordinator.config().title,
                active: self.coordinator.is_active(),
            },
            State::Joined { title, .. } => ParticipantView::Answering {
                title: title.clone(),
                timer: self.timer().to_string(),
                question: self.current_question(),
            },
            State::Submitted { title, entry, .. } => ParticipantView::Results {
                title: title.clone(),
                score: entry.score,
                total: entry.total,
                leaderboard: self.coordinator.standings().top(VIEW_LIMIT),
            },
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{
        bank::tests::{bank_with, row, two_question_bank},
        clock::{Clock, ManualClock},
        config::SessionConfig,
        coordinator::SessionCoordinator,
    };

    fn active(bank: QuizBank, config: SessionConfig) -> (Arc<ManualClock>, Arc<SessionCoordinator>) {
        let clock = Arc::new(ManualClock::default());
        let coordinator = Arc::new(SessionCoordinator::with_rng(
            clock.clone(),
            fastrand::Rng::with_seed(1),
        ));
        coordinator.load_bank(bank).unwrap();
        coordinator.save_config(config).unwrap();
        coordinator.start().unwrap();
        (clock, coordinator)
    }

    fn participant(coordinator: &Arc<SessionCoordinator>, seed: u64) -> ParticipantSession {
        ParticipantSession::with_rng(Arc::clone(coordinator), fastrand::Rng::with_seed(seed))
    }

    fn option_ids(question: &PresentedQuestion) -> Vec<&str> {
        question.options.iter().map(|o| o.option_id.as_str()).collect()
    }

    #[test]
    fn test_join_requires_active_session() {
        let coordinator = Arc::new(SessionCoordinator::new(Arc::new(ManualClock::default())));
        let mut session = ParticipantSession::new(coordinator);
        assert_eq!(
            session.join("Ann").unwrap_err(),
            Error::Precondition(Precondition::SessionInactive)
        );
        assert_eq!(session.timer(), ParticipantTimer::Waiting);
    }

    #[test]
    fn test_join_requires_name() {
        let (_, coordinator) = active(bank_with(3), SessionConfig::new("Quiz", 3, 15));
        let mut session = participant(&coordinator, 1);
        assert_eq!(
            session.join("  ").unwrap_err(),
            Error::Name(names::Error::Empty)
        );
        assert!(session.instance().is_none());
    }

    #[test]
    fn test_join_accepts_any_name_by_default() {
        let (_, coordinator) = active(bank_with(3), SessionConfig::new("Quiz", 3, 15));
        for (seed, name) in [
            "Dick Cheney",
            "Cummings",
            "Hoe Lin",
            "Anal Kumar",
            "Maria Fernanda Rodriguez-Gonzalez",
        ]
        .into_iter()
        .enumerate()
        {
            let mut session = participant(&coordinator, seed as u64);
            assert_eq!(session.join(name).unwrap().participant_name(), name);
        }
    }

    #[test]
    fn test_join_with_filtered_names() {
        let (_, coordinator) = active(bank_with(3), SessionConfig::new("Quiz", 3, 15));
        coordinator.set_name_policy(names::NamePolicy::Filtered);
        let mut session = participant(&coordinator, 1);
        assert_eq!(
            session.join(&"a".repeat(31)).unwrap_err(),
            Error::Name(names::Error::TooLong)
        );
        assert_eq!(
            session.join("fuck").unwrap_err(),
            Error::Name(names::Error::Sinful)
        );
        assert!(session.join("Ann").is_ok());
    }

    #[test]
    fn test_join_after_bank_removal_needs_new_start() {
        let (_, coordinator) = active(bank_with(3), SessionConfig::new("Quiz", 3, 15));
        coordinator.remove_bank();

        let mut session = participant(&coordinator, 1);
        assert_eq!(
            session.join("Ann").unwrap_err(),
            Error::Precondition(Precondition::SessionInactive)
        );

        coordinator.load_bank(bank_with(4)).unwrap();
        assert_eq!(
            session.join("Ann").unwrap_err(),
            Error::Precondition(Precondition::SessionInactive)
        );

        coordinator.start().unwrap();
        let instance = session.join("Ann").unwrap();
        assert_eq!(instance.session(), 2);
        assert_eq!(instance.questions().len(), 3);
    }

    #[test]
    fn test_join_builds_permuted_instance() {
        let (clock, coordinator) = active(bank_with(8), SessionConfig::new("Quiz", 5, 15));
        let selected = coordinator.selected_question_ids().unwrap();
        let mut session = participant(&coordinator, 3);
        let instance = session.join(" Ann ").unwrap();

        assert_eq!(instance.participant_name(), "Ann");
        assert_eq!(instance.started_at(), clock.now());
        assert_eq!(instance.questions().len(), 5);
        assert_eq!(instance.answers().len(), 5);
        assert!(instance.answers().values().all(Option::is_none));

        let presented: HashSet<_> = instance.questions().iter().map(|q| &q.question_id).collect();
        let drawn: HashSet<_> = selected.iter().collect();
        assert_eq!(presented, drawn);

        for question in instance.questions() {
            let mut shown = option_ids(question);
            let mut in_bank = instance
                .bank()
                .options_for(&question.question_id)
                .iter()
                .map(|r| r.option_id.as_str())
                .collect_vec();
            shown.sort_unstable();
            in_bank.sort_unstable();
            assert_eq!(shown, in_bank);
        }
    }

    #[test]
    fn test_two_participants_get_independent_orders() {
        let (_, coordinator) = active(bank_with(20), SessionConfig::new("Quiz", 20, 15));
        let mut ann = participant(&coordinator, 11);
        let mut bob = participant(&coordinator, 12);

        let ann_order = ann
            .join("Ann")
            .unwrap()
            .questions()
            .iter()
            .map(|q| q.question_id.clone())
            .collect_vec();
        let bob_order = bob
            .join("Bob")
            .unwrap()
            .questions()
            .iter()
            .map(|q| q.question_id.clone())
            .collect_vec();

        assert_ne!(ann_order, bob_order);
    }

    #[test]
    fn test_join_twice_is_rejected() {
        let (_, coordinator) = active(bank_with(3), SessionConfig::new("Quiz", 2, 15));
        let mut session = participant(&coordinator, 1);
        session.join("Ann").unwrap();
        assert_eq!(session.join("Ann").unwrap_err(), Error::AlreadyJoined);
    }

    #[test]
    fn test_vanished_questions_are_skipped() {
        let (clock, coordinator) = active(bank_with(3), SessionConfig::new("Quiz", 3, 15));
        let mut snapshot = coordinator.snapshot().unwrap();
        snapshot.bank = Arc::new(
            QuizBank::from_rows(vec![row("Q1", "Q1a", true), row("Q1", "Q1b", false)]).unwrap(),
        );

        let instance = ParticipantInstance::generate(
            "Ann".to_owned(),
            &snapshot,
            clock.now(),
            &mut fastrand::Rng::with_seed(5),
        );
        assert_eq!(instance.questions().len(), 1);
        assert_eq!(instance.questions()[0].question_id.as_str(), "Q1");
    }

    #[test]
    fn test_answer_validation() {
        let (_, coordinator) = active(two_question_bank(), SessionConfig::new("Quiz", 2, 15));
        let mut session = participant(&coordinator, 1);
        assert_eq!(
            session.answer(&"Q1".into(), &"A".into()).unwrap_err(),
            Error::NotJoined
        );
        session.join("Ann").unwrap();

        assert_eq!(
            session.answer(&"Q9".into(), &"A".into()).unwrap_err(),
            Error::UnknownQuestion("Q9".into())
        );
        assert_eq!(
            session.answer(&"Q1".into(), &"C".into()).unwrap_err(),
            Error::OptionNotPresented {
                question_id: "Q1".into(),
                option_id: "C".into()
            }
        );

        session.answer(&"Q1".into(), &"B".into()).unwrap();
        session.answer(&"Q1".into(), &"A".into()).unwrap();
        assert_eq!(
            session.instance().unwrap().answers()[&QuestionId::from("Q1")],
            Some("A".into())
        );
    }

    #[test]
    fn test_scoring_example() {
        let (clock, coordinator) = active(two_question_bank(), SessionConfig::new("Quiz", 2, 15));
        let mut session = participant(&coordinator, 1);
        session.join("Ann").unwrap();
        session.answer(&"Q1".into(), &"A".into()).unwrap();
        session.answer(&"Q2".into(), &"D".into()).unwrap();
        clock.advance(Duration::from_secs(42));

        let Submission::Recorded(entry) = session.submit().unwrap() else {
            panic!("first submit must record");
        };
        assert_eq!(entry.score, 1);
        assert_eq!(entry.total, 2);
        assert_eq!(entry.duration, Duration::from_secs(42));
        assert_eq!(entry.participant_name, "Ann");
        assert_eq!(entry.session, 1);
        assert!(session.instance().unwrap().is_submitted());
        assert_eq!(session.instance().unwrap().score(), 1);
    }

    #[test]
    fn test_submit_is_idempotent() {
        let (_, coordinator) = active(bank_with(4), SessionConfig::new("Quiz", 4, 15));
        let mut session = participant(&coordinator, 1);
        assert_eq!(session.submit().unwrap_err(), Error::NotJoined);
        session.join("Ann").unwrap();

        assert!(matches!(session.submit(), Ok(Submission::Recorded(_))));
        for _ in 0..5 {
            assert_eq!(session.submit(), Ok(Submission::AlreadySubmitted));
        }
        assert_eq!(coordinator.leaderboard().len(), 1);
        assert_eq!(session.timer(), ParticipantTimer::Finished);
        assert_eq!(
            session.answer(&"Q1".into(), &"Q1a".into()).unwrap_err(),
            Error::AlreadySubmitted
        );
    }

    #[test]
    fn test_tick_auto_submits_once() {
        let (clock, coordinator) = active(bank_with(4), SessionConfig::new("Quiz", 4, 15));
        let mut session = participant(&coordinator, 1);
        session.join("Ann").unwrap();

        clock.advance(Duration::from_secs(60));
        let tick = session.tick();
        assert_eq!(tick.timer.to_string(), "14:00");
        assert!(tick.auto_submitted.is_none());

        clock.advance(Duration::from_secs(15 * 60));
        let tick = session.tick();
        assert_eq!(tick.timer.to_string(), "Time's Up!");
        assert!(tick.auto_submitted.is_some());

        let tick = session.tick();
        assert_eq!(tick.timer, ParticipantTimer::Finished);
        assert!(tick.auto_submitted.is_none());
        assert_eq!(session.submit(), Ok(Submission::AlreadySubmitted));
        assert_eq!(coordinator.leaderboard().len(), 1);
        assert_eq!(
            coordinator.leaderboard().entries()[0].duration,
            Duration::from_secs(16 * 60)
        );
    }

    #[test]
    fn test_retake() {
        let (_, coordinator) = active(bank_with(6), SessionConfig::new("Quiz", 3, 15));
        let mut session = participant(&coordinator, 1);
        session.join("Ann").unwrap();
        assert_eq!(session.retake().unwrap_err(), Error::NotSubmitted);

        let first = session.instance().unwrap().attempt();
        session.submit().unwrap();

        coordinator.reset();
        assert_eq!(
            session.retake().unwrap_err(),
            Error::Precondition(Precondition::SessionInactive)
        );

        coordinator.start().unwrap();
        let current: HashSet<_> = coordinator
            .selected_question_ids()
            .unwrap()
            .iter()
            .cloned()
            .collect();
        let instance = session.retake().unwrap();
        assert_ne!(instance.attempt(), first);
        assert_eq!(instance.session(), 2);
        assert_eq!(instance.participant_name(), "Ann");
        assert!(instance.answers().values().all(Option::is_none));
        assert!(
            instance
                .questions()
                .iter()
                .all(|q| current.contains(&q.question_id))
        );

        session.submit().unwrap();
        session.retake().unwrap();
        session.submit().unwrap();
        let names = coordinator
            .leaderboard()
            .entries()
            .iter()
            .map(|e| e.participant_name.clone())
            .collect_vec();
        assert_eq!(names, ["Ann", "Ann"]);
    }

    #[test]
    fn test_stale_option_after_retake_is_rejected() {
        let bank = QuizBank::from_rows(vec![
            row("Q1", "A", true),
            row("Q1", "B", false),
            row("Q2", "C", true),
            row("Q2", "D", false),
        ])
        .unwrap();
        let (_, coordinator) = active(bank, SessionConfig::new("Quiz", 1, 15));
        let mut session = participant(&coordinator, 1);
        session.join("Ann").unwrap();
        let first = session.instance().unwrap().questions()[0].clone();
        session.submit().unwrap();

        coordinator.reset();
        loop {
            coordinator.start().unwrap();
            if coordinator.selected_question_ids().unwrap()[0] != first.question_id {
                break;
            }
            coordinator.reset();
        }
        session.retake().unwrap();
        assert_eq!(
            session
                .answer(&first.question_id, &first.options[0].option_id)
                .unwrap_err(),
            Error::UnknownQuestion(first.question_id.clone())
        );
    }

    #[test]
    fn test_submission_survives_bank_removal() {
        let (_, coordinator) = active(two_question_bank(), SessionConfig::new("Quiz", 2, 15));
        let mut session = participant(&coordinator, 1);
        session.join("Ann").unwrap();
        session.answer(&"Q1".into(), &"A".into()).unwrap();
        session.answer(&"Q2".into(), &"C".into()).unwrap();

        coordinator.remove_bank();

        let Submission::Recorded(entry) = session.submit().unwrap() else {
            panic!("first submit must record");
        };
        assert_eq!(entry.score, 2);
        assert_eq!(coordinator.leaderboard().len(), 1);
    }

    #[test]
    fn test_navigation_is_bounded() {
        let (_, coordinator) = active(bank_with(3), SessionConfig::new("Quiz", 3, 15));
        let mut session = participant(&coordinator, 1);
        assert_eq!(session.next(), None);
        session.join("Ann").unwrap();

        assert_eq!(session.current_index(), Some(0));
        assert_eq!(session.previous(), Some(0));
        assert_eq!(session.next(), Some(1));
        assert_eq!(session.next(), Some(2));
        assert_eq!(session.next(), Some(2));
        assert_eq!(session.go_to(99), Some(2));
        assert_eq!(session.go_to(1), Some(1));

        let view = session.current_question().unwrap();
        assert_eq!(view.index, 1);
        assert_eq!(view.count, 3);
        assert_eq!(view.selected, None);

        let option = view.question.options[2].option_id.clone();
        session.answer(&view.question.question_id, &option).unwrap();
        assert_eq!(session.current_question().unwrap().selected, Some(option));
    }

    #[test]
    fn test_views() {
        let (clock, coordinator) = active(two_question_bank(), SessionConfig::new("Trivia", 2, 15));
        let mut session = participant(&coordinator, 1);
        assert!(matches!(
            session.view(),
            ParticipantView::Waiting { active: true, .. }
        ));

        session.join("Ann").unwrap();
        clock.advance(Duration::from_secs(30));
        let ParticipantView::Answering { title, timer, question } = session.view() else {
            panic!("joined session must be answering");
        };
        assert_eq!(title, "Trivia");
        assert_eq!(timer, "14:30");
        assert!(question.is_some());

        session.submit().unwrap();
        let ParticipantView::Results {
            score,
            total,
            leaderboard,
            ..
        } = session.view()
        else {
            panic!("submitted session must show results");
        };
        assert_eq!((score, total), (0, 2));
        assert_eq!(leaderboard.exact_count(), 1);
    }

    #[test]
    fn test_integrity_warning_reaches_admin() {
        let bank = QuizBank::from_rows(vec![row("Q1", "A", false), row("Q1", "B", false)]).unwrap();
        let (_, coordinator) = active(bank, SessionConfig::new("Quiz", 1, 15));
        let mut session = participant(&coordinator, 1);
        session.join("Ann").unwrap();
        session.answer(&"Q1".into(), &"A".into()).unwrap();
        session.submit().unwrap();

        assert_eq!(coordinator.integrity_warnings().len(), 1);
        assert_eq!(coordinator.leaderboard().entries()[0].score, 0);
    }
}
