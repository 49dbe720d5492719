// src/activities/mod.rs

mod catalog;

use serde::Serialize;

use crate::engine::trial::Symbol;

pub use catalog::{catalog, find};

/// The skill an activity trains. Only used for grouping on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    SustainedAttention,
    ImpulseControl,
    BreathingRegulation,
    SocialCues,
    WorkingMemory,
}

/// Trial mechanic of an activity.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    /// Press on `go`, withhold on any of `no_go`.
    GoNoGo {
        go: Symbol,
        no_go: &'static [Symbol],
    },
    /// Reproduce a sequence drawn from `alphabet`.
    Recall { alphabet: &'static [Symbol] },
    /// Pick the label matching the shown symbol.
    Choice { pool: &'static [Symbol] },
    /// Press when the inhale cue ends.
    Paced,
}

/// How correct trials turn into the raw score persisted as `final_score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringRule {
    CorrectCount,
    /// Whole seconds of the trial cycle (display + window) per correct trial.
    CorrectSeconds,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Level {
    pub number: u8,
    pub trials: u16,
    /// Sequence length for recall, option count for choice, no-go percentage
    /// for go/no-go. Unused for paced tasks.
    pub load: u8,
    pub display_ms: u64,
    pub window_ms: u64,
    pub feedback_ms: u64,
    pub pass_percent: u8,
}

impl Level {
    pub fn cycle_seconds(&self) -> i64 {
        ((self.display_ms + self.window_ms) / 1000) as i64
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoreRange {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Serialize)]
pub struct Activity {
    pub key: &'static str,
    pub title: &'static str,
    pub skill: Skill,
    pub task: Task,
    pub scoring: ScoringRule,
    pub score_range: ScoreRange,
    pub goal_percent: u8,
    pub levels: &'static [Level],
}

impl Activity {
    pub fn level(&self, number: u8) -> Option<&Level> {
        self.levels.iter().find(|l| l.number == number)
    }

    pub fn first_level(&self) -> &Level {
        &self.levels[0]
    }

    pub fn next_level(&self, number: u8) -> Option<&Level> {
        self.level(number.saturating_add(1))
    }

    /// Credit a single correct trial earns on `level`.
    pub fn trial_credit(&self, level: &Level) -> i64 {
        match self.scoring {
            ScoringRule::CorrectCount => 1,
            ScoringRule::CorrectSeconds => level.cycle_seconds(),
        }
    }

    /// Highest raw score a run can reach by passing every level perfectly.
    pub fn max_raw_score(&self) -> i64 {
        self.levels
            .iter()
            .map(|l| self.trial_credit(l) * l.trials as i64)
            .sum()
    }

    /// Whether a response while the stimulus is still on screen counts.
    /// For recall and paced tasks it is a premature response.
    pub fn accepts_during_display(&self) -> bool {
        matches!(self.task, Task::GoNoGo { .. } | Task::Choice { .. })
    }
}
