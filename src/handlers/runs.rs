// src/handlers/runs.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    engine::Event,
    error::AppError,
    models::run::{CreateRunRequest, RespondRequest},
    runtime::{RunRegistry, RunSnapshot},
    utils::jwt::Claims,
};

/// Creates a run in the `ready` phase. Nothing is shown until `start`.
pub async fn create_run(
    State(runs): State<RunRegistry>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateRunRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let snapshot = runs
        .create(claims.user_id()?, &payload.activity, payload.demo)
        .await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub async fn get_run(
    State(runs): State<RunRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(runs.snapshot(id, claims.user_id()?).await?))
}

async fn send(
    runs: &RunRegistry,
    claims: &Claims,
    id: Uuid,
    event: Event,
) -> Result<Json<RunSnapshot>, AppError> {
    Ok(Json(runs.dispatch(id, claims.user_id()?, event).await?))
}

/// Starts the current level (from `ready`).
pub async fn start_run(
    State(runs): State<RunRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    send(&runs, &claims, id, Event::Start).await
}

/// Submits the response to the trial on screen.
pub async fn respond(
    State(runs): State<RunRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RespondRequest>,
) -> Result<impl IntoResponse, AppError> {
    send(&runs, &claims, id, Event::Respond(payload.answer)).await
}

pub async fn pause_run(
    State(runs): State<RunRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    send(&runs, &claims, id, Event::Pause).await
}

pub async fn resume_run(
    State(runs): State<RunRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    send(&runs, &claims, id, Event::Resume).await
}

pub async fn reset_run(
    State(runs): State<RunRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    send(&runs, &claims, id, Event::Reset).await
}

/// Retries saving a finished run whose first write failed.
pub async fn record_run(
    State(runs): State<RunRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(runs.retry_record(id, claims.user_id()?).await?))
}

/// Leaves a run; pending timers are cancelled and nothing is saved.
pub async fn abandon_run(
    State(runs): State<RunRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    runs.abandon(id, claims.user_id()?).await?;
    Ok(StatusCode::NO_CONTENT)
}
