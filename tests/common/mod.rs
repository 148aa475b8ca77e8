#![allow(dead_code)]

use std::{fmt::Write, sync::Arc};

use tracing_subscriber::EnvFilter;
use warp_quiz::{
    bank::QuizBank, clock::ManualClock, config::SessionConfig, coordinator::SessionCoordinator,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A bank of `questions` questions with three options each, `a` correct
pub fn bank_text(questions: usize) -> String {
    let mut text = String::from("question_id|question_text|difficulty|option_id|option_text|is_correct\n");
    for q in 1..=questions {
        for (option, correct) in [("a", 1), ("b", 0), ("c", 0)] {
            writeln!(text, "Q{q}|Question {q}?|easy|Q{q}{option}|Answer {option}|{correct}")
                .unwrap();
        }
    }
    text
}

pub fn bank(questions: usize) -> QuizBank {
    QuizBank::load(bank_text(questions).as_bytes()).unwrap()
}

pub fn active(questions: usize, config: SessionConfig) -> (Arc<ManualClock>, Arc<SessionCoordinator>) {
    init_tracing();
    let clock = Arc::new(ManualClock::default());
    let coordinator = Arc::new(SessionCoordinator::new(clock.clone()));
    coordinator.load_bank(bank(questions)).unwrap();
    coordinator.save_config(config).unwrap();
    coordinator.start().unwrap();
    (clock, coordinator)
}
