// src/scoring.rs

use serde::Serialize;

use crate::{
    activities::{Activity, Level},
    engine::trial::{Answer, Expected, Outcome, Trial},
};

/// Compares a response to the expected answer.
///
/// `answer == None` means the response window closed without input, which is
/// correct only for trials that expect the user to withhold.
pub fn classify(expected: &Expected, answer: Option<&Answer>) -> Outcome {
    match (expected, answer) {
        (Expected::Withhold, None) => Outcome::Correct,
        (_, None) => Outcome::Omitted,
        (Expected::Withhold, Some(_)) => Outcome::Incorrect,
        (Expected::Press, Some(Answer::Press)) => Outcome::Correct,
        (Expected::Choose(want), Some(Answer::Choose { symbol })) if want == symbol => {
            Outcome::Correct
        }
        (Expected::Recall(want), Some(Answer::Recall { symbols })) if want == symbols => {
            Outcome::Correct
        }
        _ => Outcome::Incorrect,
    }
}

/// Inclusive pass check: a level is passed when the accuracy percentage is at
/// least `pass_percent`. A level without trials is never passed.
pub fn level_passed(correct: u32, total: u32, pass_percent: u8) -> bool {
    if total == 0 {
        return false;
    }
    correct * 100 >= total * pass_percent as u32
}

/// Running tally of one run, across levels.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Tally {
    pub correct: u32,
    pub incorrect: u32,
    pub premature: u32,
    pub omitted: u32,
    /// Responses given to a withhold trial. Also counted in `incorrect`.
    pub commission: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub raw_score: i64,
    #[serde(skip)]
    pub reaction_times: Vec<u64>,
}

impl Tally {
    pub fn record(&mut self, activity: &Activity, level: &Level, trial: &Trial, outcome: Outcome) {
        match outcome {
            Outcome::Correct => {
                self.correct += 1;
                self.streak += 1;
                self.best_streak = self.best_streak.max(self.streak);
                self.raw_score += activity.trial_credit(level);
            }
            Outcome::Incorrect => {
                self.incorrect += 1;
                self.streak = 0;
                if trial.expected == Expected::Withhold {
                    self.commission += 1;
                }
            }
            Outcome::Premature => {
                self.premature += 1;
                self.streak = 0;
            }
            Outcome::Omitted => {
                self.omitted += 1;
                self.streak = 0;
            }
        }
        // premature presses say nothing about reaction speed
        if outcome != Outcome::Premature {
            if let Some(latency) = trial.latency_ms() {
                self.reaction_times.push(latency);
            }
        }
    }

    pub fn mean_reaction_ms(&self) -> Option<u64> {
        if self.reaction_times.is_empty() {
            return None;
        }
        let sum: u64 = self.reaction_times.iter().sum();
        Some(sum / self.reaction_times.len() as u64)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelResult {
    pub level: u8,
    pub correct: u32,
    pub total: u32,
    pub accuracy_percent: u32,
    pub passed: bool,
}

impl LevelResult {
    pub fn evaluate(level: &Level, trials: &[Trial]) -> Self {
        let total = trials.len() as u32;
        let correct = trials
            .iter()
            .filter(|t| t.outcome == Some(Outcome::Correct))
            .count() as u32;
        let accuracy_percent = if total == 0 { 0 } else { correct * 100 / total };
        Self {
            level: level.number,
            correct,
            total,
            accuracy_percent,
            passed: level_passed(correct, total, level.pass_percent),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialLog {
    pub level: u8,
    pub index: usize,
    pub outcome: Outcome,
    pub latency_ms: Option<u64>,
}

/// Final tally of a finished run, persisted as the session record `details`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub activity: &'static str,
    pub final_score: i64,
    pub highest_level: u8,
    pub levels: Vec<LevelResult>,
    pub correct: u32,
    pub incorrect: u32,
    pub premature: u32,
    pub omission_errors: u32,
    pub commission_errors: u32,
    pub best_streak: u32,
    pub mean_reaction_ms: Option<u64>,
    pub trials: Vec<TrialLog>,
}
