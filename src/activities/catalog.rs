// src/activities/catalog.rs

use super::{Activity, Level, ScoreRange, ScoringRule, Skill, Task};
use crate::engine::trial::{Color, Emotion, Shape, Symbol};

const DIGITS: &[Symbol] = &[
    Symbol::Digit(0),
    Symbol::Digit(1),
    Symbol::Digit(2),
    Symbol::Digit(3),
    Symbol::Digit(4),
    Symbol::Digit(5),
    Symbol::Digit(6),
    Symbol::Digit(7),
    Symbol::Digit(8),
    Symbol::Digit(9),
];

const EMOTIONS: &[Symbol] = &[
    Symbol::Emotion(Emotion::Happy),
    Symbol::Emotion(Emotion::Sad),
    Symbol::Emotion(Emotion::Angry),
    Symbol::Emotion(Emotion::Scared),
    Symbol::Emotion(Emotion::Surprised),
    Symbol::Emotion(Emotion::Calm),
];

const DISTRACTOR_SHAPES: &[Symbol] = &[
    Symbol::Shape(Shape::Circle),
    Symbol::Shape(Shape::Square),
    Symbol::Shape(Shape::Triangle),
    Symbol::Shape(Shape::Heart),
];

const STOP_SIGNS: &[Symbol] = &[Symbol::Color(Color::Red)];

static ACTIVITIES: &[Activity] = &[
    Activity {
        key: "traffic_light",
        title: "Traffic Light",
        skill: Skill::ImpulseControl,
        task: Task::GoNoGo {
            go: Symbol::Color(Color::Green),
            no_go: STOP_SIGNS,
        },
        scoring: ScoringRule::CorrectCount,
        score_range: ScoreRange { min: 0, max: 60 },
        goal_percent: 80,
        levels: &[
            Level {
                number: 1,
                trials: 20,
                load: 25,
                display_ms: 900,
                window_ms: 300,
                feedback_ms: 600,
                pass_percent: 75,
            },
            Level {
                number: 2,
                trials: 20,
                load: 30,
                display_ms: 700,
                window_ms: 250,
                feedback_ms: 500,
                pass_percent: 80,
            },
            Level {
                number: 3,
                trials: 20,
                load: 35,
                display_ms: 550,
                window_ms: 200,
                feedback_ms: 400,
                pass_percent: 85,
            },
        ],
    },
    Activity {
        key: "star_watch",
        title: "Star Watch",
        skill: Skill::SustainedAttention,
        task: Task::GoNoGo {
            go: Symbol::Shape(Shape::Star),
            no_go: DISTRACTOR_SHAPES,
        },
        scoring: ScoringRule::CorrectCount,
        score_range: ScoreRange { min: 0, max: 75 },
        goal_percent: 75,
        levels: &[
            Level {
                number: 1,
                trials: 25,
                load: 70,
                display_ms: 1000,
                window_ms: 500,
                feedback_ms: 300,
                pass_percent: 80,
            },
            Level {
                number: 2,
                trials: 25,
                load: 75,
                display_ms: 800,
                window_ms: 400,
                feedback_ms: 300,
                pass_percent: 80,
            },
            Level {
                number: 3,
                trials: 25,
                load: 80,
                display_ms: 650,
                window_ms: 350,
                feedback_ms: 300,
                pass_percent: 85,
            },
        ],
    },
    Activity {
        key: "number_echo",
        title: "Number Echo",
        skill: Skill::WorkingMemory,
        task: Task::Recall { alphabet: DIGITS },
        scoring: ScoringRule::CorrectCount,
        score_range: ScoreRange { min: 0, max: 10 },
        goal_percent: 70,
        levels: &[
            Level {
                number: 1,
                trials: 2,
                load: 3,
                display_ms: 3000,
                window_ms: 10_000,
                feedback_ms: 1500,
                pass_percent: 50,
            },
            Level {
                number: 2,
                trials: 2,
                load: 4,
                display_ms: 4000,
                window_ms: 12_000,
                feedback_ms: 1500,
                pass_percent: 50,
            },
            Level {
                number: 3,
                trials: 2,
                load: 5,
                display_ms: 5000,
                window_ms: 14_000,
                feedback_ms: 1500,
                pass_percent: 50,
            },
            Level {
                number: 4,
                trials: 2,
                load: 6,
                display_ms: 6000,
                window_ms: 16_000,
                feedback_ms: 1500,
                pass_percent: 50,
            },
            Level {
                number: 5,
                trials: 2,
                load: 7,
                display_ms: 7000,
                window_ms: 18_000,
                feedback_ms: 1500,
                pass_percent: 50,
            },
        ],
    },
    Activity {
        key: "feeling_faces",
        title: "Feeling Faces",
        skill: Skill::SocialCues,
        task: Task::Choice { pool: EMOTIONS },
        scoring: ScoringRule::CorrectCount,
        score_range: ScoreRange { min: 0, max: 10 },
        goal_percent: 80,
        levels: &[
            Level {
                number: 1,
                trials: 5,
                load: 3,
                display_ms: 6000,
                window_ms: 4000,
                feedback_ms: 2000,
                pass_percent: 60,
            },
            Level {
                number: 2,
                trials: 5,
                load: 6,
                display_ms: 5000,
                window_ms: 4000,
                feedback_ms: 2000,
                pass_percent: 60,
            },
        ],
    },
    Activity {
        key: "balloon_breathing",
        title: "Balloon Breathing",
        skill: Skill::BreathingRegulation,
        task: Task::Paced,
        scoring: ScoringRule::CorrectSeconds,
        score_range: ScoreRange { min: 0, max: 600 },
        goal_percent: 70,
        levels: &[
            Level {
                number: 1,
                trials: 15,
                load: 0,
                display_ms: 6000,
                window_ms: 2000,
                feedback_ms: 0,
                pass_percent: 60,
            },
            Level {
                number: 2,
                trials: 18,
                load: 0,
                display_ms: 8000,
                window_ms: 2000,
                feedback_ms: 0,
                pass_percent: 60,
            },
            Level {
                number: 3,
                trials: 25,
                load: 0,
                display_ms: 10_000,
                window_ms: 2000,
                feedback_ms: 0,
                pass_percent: 60,
            },
        ],
    },
];

pub fn catalog() -> &'static [Activity] {
    ACTIVITIES
}

pub fn find(key: &str) -> Option<&'static Activity> {
    ACTIVITIES.iter().find(|a| a.key == key)
}
