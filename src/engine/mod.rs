// src/engine/mod.rs

//! Per-run phase machine.
//!
//! The engine never touches a clock or a timer itself. Every event carries the
//! run-relative time in milliseconds, and every transition that needs a delay
//! hands back a [`TimerRequest`] tagged with the current generation. Any
//! transition bumps the generation, so a timer that fires after the run moved
//! on is recognised as stale and dropped.

pub mod generator;
pub mod trial;

use std::{fmt, time::Duration};

use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;

use crate::{
    activities::{Activity, Level},
    scoring::{LevelResult, RunSummary, Tally, TrialLog, classify},
};
use generator::generate_round;
use trial::{Answer, Outcome, Symbol, Trial};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Ready { level: u8 },
    Showing { trial: usize },
    Input { trial: usize },
    Feedback { trial: usize, outcome: Outcome },
    Paused { trial: usize },
    Finished,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Ready { .. } => "ready",
            Phase::Showing { .. } => "showing",
            Phase::Input { .. } => "input",
            Phase::Feedback { .. } => "feedback",
            Phase::Paused { .. } => "paused",
            Phase::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    Display,
    Window,
    Feedback,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    Respond(Answer),
    TimerFired { generation: u64, timer: TimerKind },
    Pause,
    Resume,
    Reset,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::Respond(_) => "respond",
            Event::TimerFired { .. } => "timer",
            Event::Pause => "pause",
            Event::Resume => "resume",
            Event::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRequest {
    pub generation: u64,
    pub timer: TimerKind,
    pub after: Duration,
}

/// What the caller has to do after an event was applied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub timer: Option<TimerRequest>,
    pub finished: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    IllegalTransition {
        phase: &'static str,
        event: &'static str,
    },
    NotAcceptingInput {
        phase: &'static str,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::IllegalTransition { phase, event } => {
                write!(f, "cannot {} while {}", event, phase)
            }
            EngineError::NotAcceptingInput { phase } => {
                write!(f, "responses are not accepted while {}", phase)
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Client-facing view of the current phase. Expected answers stay hidden.
#[derive(Debug, Clone, Serialize)]
pub struct Presentation {
    pub activity: &'static str,
    pub phase: Phase,
    pub level: u8,
    pub trials_in_level: usize,
    pub stimulus: Option<Vec<Symbol>>,
    pub choices: Option<Vec<Symbol>>,
    pub score: i64,
    pub streak: u32,
    pub best_streak: u32,
}

pub struct Engine {
    activity: &'static Activity,
    level: u8,
    trials: Vec<Trial>,
    phase: Phase,
    generation: u64,
    tally: Tally,
    levels: Vec<LevelResult>,
    log: Vec<TrialLog>,
    rng: StdRng,
}

impl Engine {
    pub fn new(activity: &'static Activity, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let first = activity.first_level();
        let trials = generate_round(activity, first, &mut rng);
        Self {
            activity,
            level: first.number,
            trials,
            phase: Phase::Ready {
                level: first.number,
            },
            generation: 0,
            tally: Tally::default(),
            levels: Vec::new(),
            log: Vec::new(),
            rng,
        }
    }

    pub fn activity(&self) -> &'static Activity {
        self.activity
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    fn current_level(&self) -> &'static Level {
        let activity = self.activity;
        activity
            .level(self.level)
            .unwrap_or_else(|| activity.first_level())
    }

    /// Applies one event at run time `now_ms`.
    pub fn handle(&mut self, event: Event, now_ms: u64) -> Result<Step, EngineError> {
        let phase = self.phase;
        let event_name = event.name();
        match (phase, event) {
            (_, Event::TimerFired { generation, timer }) if generation != self.generation => {
                tracing::debug!(
                    "Ignoring stale {:?} timer (generation {} != {})",
                    timer,
                    generation,
                    self.generation
                );
                Ok(Step::default())
            }
            (Phase::Ready { .. }, Event::Start) => Ok(self.show(0, now_ms)),
            (
                Phase::Showing { trial },
                Event::TimerFired {
                    timer: TimerKind::Display,
                    ..
                },
            ) => {
                self.phase = Phase::Input { trial };
                Ok(self.arm(TimerKind::Window, self.current_level().window_ms))
            }
            (Phase::Showing { trial }, Event::Respond(answer)) => {
                if self.activity.accepts_during_display() {
                    Ok(self.score(trial, Some(answer), now_ms))
                } else {
                    Ok(self.conclude(trial, Outcome::Premature, Some(answer), now_ms))
                }
            }
            (Phase::Input { trial }, Event::Respond(answer)) => {
                Ok(self.score(trial, Some(answer), now_ms))
            }
            (
                Phase::Input { trial },
                Event::TimerFired {
                    timer: TimerKind::Window,
                    ..
                },
            ) => Ok(self.score(trial, None, now_ms)),
            (
                Phase::Feedback { trial, .. },
                Event::TimerFired {
                    timer: TimerKind::Feedback,
                    ..
                },
            ) => Ok(self.advance(trial, now_ms)),
            (
                Phase::Showing { trial } | Phase::Input { trial } | Phase::Feedback { trial, .. },
                Event::Pause,
            ) => {
                self.generation += 1;
                self.phase = Phase::Paused { trial };
                Ok(Step::default())
            }
            (Phase::Paused { trial }, Event::Resume) => {
                if self.trials[trial].outcome.is_some() {
                    Ok(self.advance(trial, now_ms))
                } else {
                    Ok(self.show(trial, now_ms))
                }
            }
            (Phase::Finished, Event::Reset) => Err(EngineError::IllegalTransition {
                phase: phase.name(),
                event: event_name,
            }),
            (_, Event::Reset) => {
                self.reset();
                Ok(Step::default())
            }
            (
                Phase::Ready { .. }
                | Phase::Feedback { .. }
                | Phase::Paused { .. }
                | Phase::Finished,
                Event::Respond(_),
            ) => Err(EngineError::NotAcceptingInput {
                phase: phase.name(),
            }),
            _ => Err(EngineError::IllegalTransition {
                phase: phase.name(),
                event: event_name,
            }),
        }
    }

    fn arm(&mut self, timer: TimerKind, after_ms: u64) -> Step {
        self.generation += 1;
        Step {
            timer: Some(TimerRequest {
                generation: self.generation,
                timer,
                after: Duration::from_millis(after_ms),
            }),
            finished: false,
        }
    }

    fn show(&mut self, index: usize, now_ms: u64) -> Step {
        let trial = &mut self.trials[index];
        trial.shown_at = Some(now_ms);
        trial.responded_at = None;
        trial.answer = None;
        self.phase = Phase::Showing { trial: index };
        self.arm(TimerKind::Display, self.current_level().display_ms)
    }

    fn score(&mut self, index: usize, answer: Option<Answer>, now_ms: u64) -> Step {
        let outcome = classify(&self.trials[index].expected, answer.as_ref());
        self.conclude(index, outcome, answer, now_ms)
    }

    fn conclude(
        &mut self,
        index: usize,
        outcome: Outcome,
        answer: Option<Answer>,
        now_ms: u64,
    ) -> Step {
        let level = self.current_level();
        let trial = &mut self.trials[index];
        if answer.is_some() {
            trial.responded_at = Some(now_ms);
        }
        trial.answer = answer;
        trial.outcome = Some(outcome);

        let trial = &self.trials[index];
        self.tally.record(self.activity, level, trial, outcome);
        self.log.push(TrialLog {
            level: level.number,
            index,
            outcome,
            latency_ms: trial.latency_ms(),
        });

        self.phase = Phase::Feedback {
            trial: index,
            outcome,
        };
        self.arm(TimerKind::Feedback, level.feedback_ms)
    }

    fn advance(&mut self, index: usize, now_ms: u64) -> Step {
        if index + 1 < self.trials.len() {
            return self.show(index + 1, now_ms);
        }

        let level = self.current_level();
        let result = LevelResult::evaluate(level, &self.trials);
        let passed = result.passed;
        tracing::debug!(
            "{} level {} done: {}/{} (passed: {})",
            self.activity.key,
            level.number,
            result.correct,
            result.total,
            passed
        );
        self.levels.push(result);
        self.generation += 1;

        match self.activity.next_level(level.number) {
            Some(next) if passed => {
                self.level = next.number;
                self.trials = generate_round(self.activity, next, &mut self.rng);
                self.phase = Phase::Ready { level: next.number };
                Step::default()
            }
            _ => {
                self.phase = Phase::Finished;
                Step {
                    timer: None,
                    finished: true,
                }
            }
        }
    }

    fn reset(&mut self) {
        let first = self.activity.first_level();
        self.level = first.number;
        self.trials = generate_round(self.activity, first, &mut self.rng);
        self.tally = Tally::default();
        self.levels.clear();
        self.log.clear();
        self.generation += 1;
        self.phase = Phase::Ready {
            level: first.number,
        };
    }

    pub fn presentation(&self) -> Presentation {
        let current = match self.phase {
            Phase::Showing { trial }
            | Phase::Input { trial }
            | Phase::Feedback { trial, .. }
            | Phase::Paused { trial } => self.trials.get(trial),
            _ => None,
        };
        let stimulus = match self.phase {
            Phase::Showing { .. } => current.map(|t| t.stimulus.clone()),
            _ => None,
        };
        let choices = match self.phase {
            Phase::Showing { .. } | Phase::Input { .. } => current
                .filter(|t| !t.choices.is_empty())
                .map(|t| t.choices.clone()),
            _ => None,
        };
        Presentation {
            activity: self.activity.key,
            phase: self.phase,
            level: self.level,
            trials_in_level: self.trials.len(),
            stimulus,
            choices,
            score: self.tally.raw_score,
            streak: self.tally.streak,
            best_streak: self.tally.best_streak,
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            activity: self.activity.key,
            final_score: self.tally.raw_score.max(0),
            highest_level: self
                .levels
                .iter()
                .filter(|l| l.passed)
                .map(|l| l.level)
                .max()
                .unwrap_or(0),
            levels: self.levels.clone(),
            correct: self.tally.correct,
            incorrect: self.tally.incorrect,
            premature: self.tally.premature,
            omission_errors: self.tally.omitted,
            commission_errors: self.tally.commission,
            best_streak: self.tally.best_streak,
            mean_reaction_ms: self.tally.mean_reaction_ms(),
            trials: self.log.clone(),
        }
    }
}
