// src/engine/trial.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Circle,
    Square,
    Triangle,
    Star,
    Heart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Scared,
    Surprised,
    Calm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
}

/// Anything a trial can put on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Symbol {
    Digit(u8),
    Shape(Shape),
    Emotion(Emotion),
    Color(Color),
    Inhale,
}

/// What the scorer expects for a trial. Never sent to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    Press,
    Withhold,
    Choose(Symbol),
    Recall(Vec<Symbol>),
}

/// A single user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Answer {
    Press,
    Choose { symbol: Symbol },
    Recall { symbols: Vec<Symbol> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Incorrect,
    Premature,
    Omitted,
}

#[derive(Debug, Clone)]
pub struct Trial {
    pub index: usize,
    pub stimulus: Vec<Symbol>,
    pub choices: Vec<Symbol>,
    pub expected: Expected,
    pub shown_at: Option<u64>,
    pub responded_at: Option<u64>,
    pub answer: Option<Answer>,
    pub outcome: Option<Outcome>,
}

impl Trial {
    pub fn new(index: usize, stimulus: Vec<Symbol>, expected: Expected) -> Self {
        Self {
            index,
            stimulus,
            choices: Vec::new(),
            expected,
            shown_at: None,
            responded_at: None,
            answer: None,
            outcome: None,
        }
    }

    pub fn with_choices(mut self, choices: Vec<Symbol>) -> Self {
        self.choices = choices;
        self
    }

    /// Milliseconds between display and response. A response can never
    /// precede its stimulus.
    pub fn latency_ms(&self) -> Option<u64> {
        match (self.shown_at, self.responded_at) {
            (Some(shown), Some(responded)) => Some(responded.saturating_sub(shown)),
            _ => None,
        }
    }
}
