mod questionnaire;
mod task;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::core::questionnaire::Questionnaire;
use crate::core::task::{Task, TaskStatus};

#[async_trait]
pub trait QuestionnaireRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Questionnaire>>;
    async fn list(&self) -> Result<Vec<Questionnaire>>;
    async fn insert(&self, questionnaire: &Questionnaire) -> Result<()>;
    /// Returns false when no record has `id`.
    async fn replace(&self, id: &str, questionnaire: &Questionnaire) -> Result<bool>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Task>>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<Task>>;
    async fn insert(&self, task: &Task) -> Result<()>;
    async fn replace(&self, id: &str, task: &Task) -> Result<bool>;
    async fn delete(&self, id: &str) -> Result<bool>;
    async fn set_status(&self, id: &str, status: TaskStatus) -> Result<bool>;
    async fn set_output_path(&self, id: &str, output_path: &str) -> Result<bool>;
}

/// SQLite-backed store for questionnaires and tasks.
#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens the database at `path`; the literal `:memory:` opens a private
    /// in-memory database.
    pub fn open(path: &Path) -> Result<Self> {
        let db = if path.as_os_str() == ":memory:" {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            Connection::open(path).with_context(|| format!("opening {}", path.display()))?
        };
        Self::init_schema(&db)?;
        info!("Store opened at {}", path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:"))
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute(
            "CREATE TABLE IF NOT EXISTS questionnaires (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                questions_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL
            )",
            [],
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                source_type TEXT NOT NULL,
                source_path TEXT NOT NULL,
                output_type TEXT NOT NULL,
                output_path TEXT NOT NULL,
                google_api_key TEXT NOT NULL,
                google_credentials TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        db.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_created ON tasks(created_at)",
            [],
        )?;
        Ok(())
    }
}

/// Fixed-width RFC 3339 so text order matches time order.
pub(crate) fn encode_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_time(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("bad timestamp in store: {}", raw))?
        .with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_encoding_round_trips_and_sorts() {
        let a = Utc::now();
        let b = a + chrono::Duration::milliseconds(1500);
        assert_eq!(decode_time(&encode_time(&a)).unwrap(), a);
        assert!(encode_time(&a) < encode_time(&b));
    }

    #[test]
    fn open_creates_parent_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("questflow.db");
        Store::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn reopening_keeps_schema() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("questflow.db");
        Store::open(&path).unwrap();
        Store::open(&path).unwrap();
    }
}
