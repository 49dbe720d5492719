// src/store/local.rs

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{SessionStore, StoreError};
use crate::models::session_record::{NewSessionRecord, SessionRecord};

/// File sink: one JSON document per record, named after its completion time.
///
/// Same record shape as the relational sink, meant for offline installs.
#[derive(Debug, Clone)]
pub struct LocalSessionStore {
    dir: PathBuf,
}

impl LocalSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name(record: &SessionRecord) -> String {
        format!(
            "session-{}-{}-{}.json",
            record.completed_at.timestamp_millis(),
            record.user_id,
            &record.id[..8]
        )
    }

    async fn read_record(path: &Path) -> Result<SessionRecord, StoreError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl SessionStore for LocalSessionStore {
    async fn insert(&self, record: NewSessionRecord) -> Result<SessionRecord, StoreError> {
        let record = record.into_record(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(Self::file_name(&record));
        let body = serde_json::to_vec_pretty(&record)?;
        tokio::fs::write(&path, body).await?;
        tracing::debug!("Wrote session record to {}", path.display());

        Ok(record)
    }

    async fn list(
        &self,
        user_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with("session-") || !name.ends_with(".json") {
                continue;
            }
            match Self::read_record(&entry.path()).await {
                Ok(record) => {
                    let in_window = since.is_none_or(|s| record.completed_at >= s);
                    if record.user_id == user_id && in_window {
                        records.push(record);
                    }
                }
                Err(e) => tracing::warn!("Skipping unreadable session file {}: {}", name, e),
            }
        }

        records.sort_by_key(|r| r.completed_at);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_record(user_id: i64, score: i64, completed_at: DateTime<Utc>) -> NewSessionRecord {
        NewSessionRecord {
            user_id,
            activity_name: "number_echo".to_string(),
            final_score: score,
            completed_at,
            details: serde_json::json!({ "omission_errors": 1 }),
        }
    }

    #[tokio::test]
    async fn insert_then_list_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSessionStore::new(dir.path().join("sessions"));
        let now = Utc::now();

        store.insert(new_record(1, 7, now)).await.unwrap();
        store
            .insert(new_record(1, 3, now - Duration::days(3)))
            .await
            .unwrap();
        store.insert(new_record(2, 9, now)).await.unwrap();

        let mine = store.list(1, None).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].final_score, 3);
        assert_eq!(mine[1].details.0["omission_errors"], 1);

        let recent = store.list(1, Some(now - Duration::days(1))).await.unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSessionStore::new(dir.path().join("never-created"));
        assert!(store.list(1, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn negative_scores_are_floored() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSessionStore::new(dir.path());
        let saved = store.insert(new_record(1, -4, Utc::now())).await.unwrap();
        assert_eq!(saved.final_score, 0);
    }

    #[tokio::test]
    async fn foreign_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), b"hello")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("session-1-1-broken.json"), b"{")
            .await
            .unwrap();
        let store = LocalSessionStore::new(dir.path());
        assert!(store.list(1, None).await.unwrap().is_empty());
    }
}
