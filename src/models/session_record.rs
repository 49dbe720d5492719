// src/models/session_record.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

/// Represents the 'session_records' table.
/// One row per completed exercise attempt; written once, never updated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: i64,

    /// Activity key from the catalog (e.g. "number_echo").
    pub activity_name: String,

    /// Raw score on the activity's own scale. Never negative.
    pub final_score: i64,

    pub completed_at: DateTime<Utc>,

    /// Free-form per-activity metrics (reaction times, error counts, trial log).
    pub details: Json<serde_json::Value>,
}

/// Insert payload handed to a session store.
#[derive(Debug, Clone)]
pub struct NewSessionRecord {
    pub user_id: i64,
    pub activity_name: String,
    pub final_score: i64,
    pub completed_at: DateTime<Utc>,
    pub details: serde_json::Value,
}

impl NewSessionRecord {
    pub fn into_record(self, id: String) -> SessionRecord {
        SessionRecord {
            id,
            user_id: self.user_id,
            activity_name: self.activity_name,
            final_score: self.final_score.max(0),
            completed_at: self.completed_at,
            details: Json(self.details),
        }
    }
}

/// Query parameters shared by the sessions and dashboard endpoints.
#[derive(Debug, Deserialize)]
pub struct WindowParams {
    pub window: Option<crate::stats::Window>,
}
