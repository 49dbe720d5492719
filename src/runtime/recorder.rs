// src/runtime/recorder.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    models::session_record::{NewSessionRecord, SessionRecord},
    scoring::RunSummary,
    store::{SessionStore, StoreError},
};

/// Persistence state of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordStatus {
    /// Run still in progress, or the write has not completed yet.
    Pending,
    Saved { record_id: String },
    /// The summary is kept; the client may ask for another attempt.
    Failed { message: String },
    /// Demo run, nothing is written.
    Skipped,
}

/// Writes run summaries to whichever sink the service was configured with.
#[derive(Clone)]
pub struct SessionRecorder {
    store: Arc<dyn SessionStore>,
}

impl SessionRecorder {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn record(
        &self,
        user_id: i64,
        summary: &RunSummary,
        completed_at: DateTime<Utc>,
    ) -> Result<SessionRecord, StoreError> {
        let record = NewSessionRecord {
            user_id,
            activity_name: summary.activity.to_string(),
            final_score: summary.final_score,
            completed_at,
            details: serde_json::to_value(summary)?,
        };
        let saved = self.store.insert(record).await?;
        tracing::info!(
            "Recorded {} session {} for user {} (score {})",
            saved.activity_name,
            saved.id,
            user_id,
            saved.final_score
        );
        Ok(saved)
    }
}
