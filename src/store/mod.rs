// src/store/mod.rs

//! Session record sinks. Both implementations are insert-only.

mod local;
mod sql;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::session_record::{NewSessionRecord, SessionRecord};

pub use local::LocalSessionStore;
pub use sql::SqlSessionStore;

#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    Io(std::io::Error),
    Encoding(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "database error: {}", e),
            StoreError::Io(e) => write!(f, "storage error: {}", e),
            StoreError::Encoding(e) => write!(f, "encoding error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Encoding(err)
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a finished session and returns the stored row.
    async fn insert(&self, record: NewSessionRecord) -> Result<SessionRecord, StoreError>;

    /// A user's records completed at or after `since`, oldest first.
    async fn list(
        &self,
        user_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SessionRecord>, StoreError>;
}
