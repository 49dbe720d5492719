// src/handlers/sessions.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    error::AppError,
    models::session_record::WindowParams,
    stats,
    store::SessionStore,
    utils::jwt::Claims,
};

/// Lists the current user's recorded sessions, oldest first.
pub async fn list_sessions(
    State(store): State<Arc<dyn SessionStore>>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<WindowParams>,
) -> Result<impl IntoResponse, AppError> {
    let window = params.window.unwrap_or_default();
    let records = store
        .list(claims.user_id()?, window.since(Utc::now()))
        .await?;
    Ok(Json(records))
}

/// Per-activity progress report for the dashboard charts.
pub async fn get_dashboard(
    State(store): State<Arc<dyn SessionStore>>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<WindowParams>,
) -> Result<impl IntoResponse, AppError> {
    let window = params.window.unwrap_or_default();
    let now = Utc::now();
    let records = store.list(claims.user_id()?, window.since(now)).await?;
    Ok(Json(stats::aggregate(&records, window, now)))
}
