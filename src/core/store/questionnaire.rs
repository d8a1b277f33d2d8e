use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rusqlite::params;

use super::{QuestionnaireRepository, Store, decode_time, encode_time};
use crate::core::questionnaire::{Questionnaire, QuestionnaireStatus};

struct QuestionnaireRow {
    id: String,
    title: String,
    questions_json: String,
    created_at: String,
    status: String,
}

impl QuestionnaireRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            questions_json: row.get(2)?,
            created_at: row.get(3)?,
            status: row.get(4)?,
        })
    }

    fn into_questionnaire(self) -> Result<Questionnaire> {
        let status = QuestionnaireStatus::from_status(&self.status)
            .ok_or_else(|| anyhow!("unknown questionnaire status in store: {}", self.status))?;
        Ok(Questionnaire {
            questions: serde_json::from_str(&self.questions_json)?,
            created_at: decode_time(&self.created_at)?,
            id: self.id,
            title: self.title,
            status,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, title, questions_json, created_at, status FROM questionnaires";

#[async_trait]
impl QuestionnaireRepository for Store {
    async fn get(&self, id: &str) -> Result<Option<Questionnaire>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!("{} WHERE id = ?1 LIMIT 1", SELECT_COLUMNS))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(QuestionnaireRow::from_row(row)?.into_questionnaire()?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Questionnaire>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "{} ORDER BY created_at ASC, rowid ASC",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map([], QuestionnaireRow::from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_questionnaire()?);
        }
        Ok(out)
    }

    async fn insert(&self, questionnaire: &Questionnaire) -> Result<()> {
        let questions_json = serde_json::to_string(&questionnaire.questions)?;
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO questionnaires (id, title, questions_json, created_at, status) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                questionnaire.id,
                questionnaire.title,
                questions_json,
                encode_time(&questionnaire.created_at),
                questionnaire.status.as_str()
            ],
        )?;
        Ok(())
    }

    async fn replace(&self, id: &str, questionnaire: &Questionnaire) -> Result<bool> {
        let questions_json = serde_json::to_string(&questionnaire.questions)?;
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE questionnaires SET title = ?1, questions_json = ?2, created_at = ?3, status = ?4 WHERE id = ?5",
            params![
                questionnaire.title,
                questions_json,
                encode_time(&questionnaire.created_at),
                questionnaire.status.as_str(),
                id
            ],
        )?;
        Ok(rows > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute("DELETE FROM questionnaires WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
