// src/store/sql.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, types::Json};
use uuid::Uuid;

use super::{SessionStore, StoreError};
use crate::models::session_record::{NewSessionRecord, SessionRecord};

/// Relational sink backed by the `session_records` table.
#[derive(Clone)]
pub struct SqlSessionStore {
    pool: SqlitePool,
}

impl SqlSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn insert(&self, record: NewSessionRecord) -> Result<SessionRecord, StoreError> {
        let record = record.into_record(Uuid::new_v4().to_string());

        sqlx::query(
            r#"
            INSERT INTO session_records
                (id, user_id, activity_name, final_score, completed_at, details)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(record.user_id)
        .bind(&record.activity_name)
        .bind(record.final_score)
        .bind(record.completed_at)
        .bind(Json(&record.details.0))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert session record: {:?}", e);
            StoreError::from(e)
        })?;

        Ok(record)
    }

    async fn list(
        &self,
        user_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        let mut query_builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, user_id, activity_name, final_score, completed_at, details
             FROM session_records WHERE user_id = ",
        );
        query_builder.push_bind(user_id);
        if let Some(since) = since {
            query_builder.push(" AND completed_at >= ").push_bind(since);
        }
        query_builder.push(" ORDER BY completed_at ASC");

        let records = query_builder
            .build_query_as::<SessionRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }
}
