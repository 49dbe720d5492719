// src/handlers/activities.rs

use axum::{Json, extract::Path, response::IntoResponse};

use crate::{activities, error::AppError};

/// Lists every exercise with its level table and scoring range.
pub async fn list_activities() -> impl IntoResponse {
    Json(activities::catalog())
}

pub async fn get_activity(Path(key): Path<String>) -> Result<impl IntoResponse, AppError> {
    let activity = activities::find(&key)
        .ok_or_else(|| AppError::NotFound(format!("Activity '{}' not found", key)))?;
    Ok(Json(activity))
}
