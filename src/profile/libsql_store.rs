//! libSQL-backed profile store.
//!
//! Answers are kept as a JSON blob in the `settings` table, one row per
//! `(user_id, key)`, upserted on every save.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::quiz::AnswerSet;

use super::{PROFILE_KEY, ProfileStore, migrations};

pub struct LibSqlProfileStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    user_id: String,
}

impl LibSqlProfileStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path, user_id: &str) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db, user_id).await?;
        info!(path = %path.display(), user = user_id, "Profile database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory(user_id: &str) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db, user_id).await
    }

    async fn from_database(db: LibSqlDatabase, user_id: &str) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            user_id: user_id.to_string(),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// When the answers were last saved.
    pub async fn last_saved(&self) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT updated_at FROM settings WHERE user_id = ?1 AND key = ?2",
                params![self.user_id.as_str(), PROFILE_KEY],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("last_saved: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("last_saved: {e}")))?;
                Ok(DateTime::parse_from_rfc3339(&raw)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc)))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("last_saved: {e}"))),
        }
    }

    /// Forget the saved answers. Returns whether anything was deleted.
    pub async fn clear(&self) -> Result<bool, DatabaseError> {
        let count = self
            .conn
            .execute(
                "DELETE FROM settings WHERE user_id = ?1 AND key = ?2",
                params![self.user_id.as_str(), PROFILE_KEY],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("clear: {e}")))?;
        Ok(count > 0)
    }
}

#[async_trait]
impl ProfileStore for LibSqlProfileStore {
    async fn load(&self) -> Result<Option<AnswerSet>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM settings WHERE user_id = ?1 AND key = ?2",
                params![self.user_id.as_str(), PROFILE_KEY],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("load profile: {e}")))?;

        let row = match rows.next().await {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(e) => return Err(DatabaseError::Query(format!("load profile: {e}"))),
        };
        let raw: String = row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("load profile: {e}")))?;
        let answers: AnswerSet =
            serde_json::from_str(&raw).map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        debug!(user = %self.user_id, answers = answers.len(), "Profile loaded");
        Ok(Some(answers))
    }

    async fn save(&self, answers: &AnswerSet) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let value =
            serde_json::to_string(answers).map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO settings (user_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
                params![self.user_id.as_str(), PROFILE_KEY, value, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save profile: {e}")))?;
        debug!(user = %self.user_id, answers = answers.len(), "Profile saved");
        Ok(())
    }
}
