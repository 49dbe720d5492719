use std::sync::Arc;

use crate::{config::Config, runtime::RunRegistry, store::SessionStore};
use axum::extract::FromRef;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub runs: RunRegistry,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config, runs: RunRegistry) -> Self {
        Self { pool, config, runs }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for RunRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.runs.clone()
    }
}

impl FromRef<AppState> for Arc<dyn SessionStore> {
    fn from_ref(state: &AppState) -> Self {
        state.runs.recorder().store().clone()
    }
}
