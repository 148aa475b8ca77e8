//! Scoring of a submitted attempt

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    bank::{DataIntegrityWarning, OptionId, QuestionId, QuizBank},
    participant::ParticipantInstance,
};

/// Outcome of scoring one attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreReport {
    /// Correctly answered questions
    pub score: usize,
    /// Questions presented to the participant
    pub total: usize,
    /// Answered questions that could not be scored
    pub warnings: Vec<DataIntegrityWarning>,
}

/// Scores an instance against the bank it was generated from
pub fn score(instance: &ParticipantInstance, bank: &QuizBank) -> ScoreReport {
    score_answers(instance.answers(), instance.questions().len(), bank)
}

/// Scores an answer map
///
/// A question earns a point iff the selected option is the one flagged
/// correct in `bank`. Unanswered questions earn nothing. Answered questions
/// without a correct option earn nothing and are reported in
/// [`ScoreReport::warnings`].
pub fn score_answers(
    answers: &HashMap<QuestionId, Option<OptionId>>,
    presented: usize,
    bank: &QuizBank,
) -> ScoreReport {
    let mut score = 0;
    let mut warnings = Vec::new();

    for (question_id, selected) in answers {
        let Some(selected) = selected else {
            continue;
        };
        match bank.correct_option(question_id) {
            Some(correct) if correct == selected => score += 1,
            Some(_) => {}
            None => {
                let warning = DataIntegrityWarning::MissingCorrectOption(question_id.clone());
                tracing::warn!(%warning, "unscorable question");
                warnings.push(warning);
            }
        }
    }

    warnings.sort_by(|a, b| a.question_id().cmp(b.question_id()));

    ScoreReport {
        score,
        total: presented,
        warnings,
    }
}
