// src/models/run.rs

use serde::Deserialize;
use validator::Validate;

use crate::engine::trial::Answer;

/// DTO for starting a new exercise run.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRunRequest {
    #[validate(length(min = 1, max = 50))]
    pub activity: String,

    /// Demo runs are played normally but never saved.
    #[serde(default)]
    pub demo: bool,
}

/// DTO for a single response during a run.
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub answer: Answer,
}
