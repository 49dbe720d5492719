// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{activities, auth, runs, sessions},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, activities, runs, sessions/dashboard).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (database pool, config, live runs).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:5173"),
        HeaderValue::from_static("http://127.0.0.1:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let activity_routes = Router::new()
        .route("/", get(activities::list_activities))
        .route("/{key}", get(activities::get_activity));

    // Everything below needs a signed-in user
    let run_routes = Router::new()
        .route("/", post(runs::create_run))
        .route("/{id}", get(runs::get_run).delete(runs::abandon_run))
        .route("/{id}/start", post(runs::start_run))
        .route("/{id}/respond", post(runs::respond))
        .route("/{id}/pause", post(runs::pause_run))
        .route("/{id}/resume", post(runs::resume_run))
        .route("/{id}/reset", post(runs::reset_run))
        .route("/{id}/record", post(runs::record_run))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let progress_routes = Router::new()
        .route("/sessions", get(sessions::list_sessions))
        .route("/dashboard", get(sessions::get_dashboard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/activities", activity_routes)
        .nest("/api/runs", run_routes)
        .nest("/api", progress_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
