use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rusqlite::params;

use super::{Store, TaskRepository, decode_time, encode_time};
use crate::core::task::{Task, TaskStatus};

const SELECT_COLUMNS: &str = "SELECT id, name, source_type, source_path, output_type, output_path,
    google_api_key, google_credentials, status, created_at FROM tasks";

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<Task> {
    let status: String = row.get(8)?;
    let created_at: String = row.get(9)?;
    Ok(Task {
        id: row.get(0)?,
        name: row.get(1)?,
        source_type: row.get(2)?,
        source_path: row.get(3)?,
        output_type: row.get(4)?,
        output_path: row.get(5)?,
        google_api_key: row.get(6)?,
        google_credentials: row.get(7)?,
        status: TaskStatus::from_status(&status)
            .ok_or_else(|| anyhow!("unknown task status in store: {}", status))?,
        created_at: decode_time(&created_at)?,
    })
}

#[async_trait]
impl TaskRepository for Store {
    async fn get(&self, id: &str) -> Result<Option<Task>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!("{} WHERE id = ?1 LIMIT 1", SELECT_COLUMNS))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_task(row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Task>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "{} ORDER BY created_at DESC, rowid DESC",
            SELECT_COLUMNS
        ))?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_task(row)?);
        }
        Ok(out)
    }

    async fn insert(&self, task: &Task) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO tasks (id, name, source_type, source_path, output_type, output_path,
                google_api_key, google_credentials, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                task.id,
                task.name,
                task.source_type,
                task.source_path,
                task.output_type,
                task.output_path,
                task.google_api_key,
                task.google_credentials,
                task.status.as_str(),
                encode_time(&task.created_at)
            ],
        )?;
        Ok(())
    }

    async fn replace(&self, id: &str, task: &Task) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE tasks SET name = ?1, source_type = ?2, source_path = ?3, output_type = ?4,
                output_path = ?5, google_api_key = ?6, google_credentials = ?7, status = ?8,
                created_at = ?9
             WHERE id = ?10",
            params![
                task.name,
                task.source_type,
                task.source_path,
                task.output_type,
                task.output_path,
                task.google_api_key,
                task.google_credentials,
                task.status.as_str(),
                encode_time(&task.created_at),
                id
            ],
        )?;
        Ok(rows > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    async fn set_status(&self, id: &str, status: TaskStatus) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE tasks SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(rows > 0)
    }

    async fn set_output_path(&self, id: &str, output_path: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE tasks SET output_path = ?1 WHERE id = ?2",
            params![output_path, id],
        )?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::TaskInput;

    fn task(name: &str) -> Task {
        let input: TaskInput =
            serde_json::from_value(serde_json::json!({ "name": name, "outputType": "csv" }))
                .unwrap();
        Task::create(input)
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = Store::in_memory().unwrap();
        let t = task("Invoices");
        store.insert(&t).await.unwrap();
        assert_eq!(TaskRepository::get(&store, &t.id).await.unwrap(), Some(t));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = Store::in_memory().unwrap();
        let mut older = task("Older");
        older.created_at -= chrono::Duration::seconds(60);
        let newer = task("Newer");
        store.insert(&older).await.unwrap();
        store.insert(&newer).await.unwrap();
        let names: Vec<String> = TaskRepository::list(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Newer", "Older"]);
    }

    #[tokio::test]
    async fn set_status_and_output_path() {
        let store = Store::in_memory().unwrap();
        let t = task("Invoices");
        store.insert(&t).await.unwrap();

        assert!(store.set_status(&t.id, TaskStatus::InProgress).await.unwrap());
        assert!(store.set_output_path(&t.id, "/tmp/out.csv").await.unwrap());
        let loaded = TaskRepository::get(&store, &t.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::InProgress);
        assert_eq!(loaded.output_path, "/tmp/out.csv");

        assert!(!store.set_status("ghost", TaskStatus::Failed).await.unwrap());
    }

    #[tokio::test]
    async fn replace_and_delete() {
        let store = Store::in_memory().unwrap();
        let t = task("Invoices");
        store.insert(&t).await.unwrap();

        let mut renamed = t.clone();
        renamed.name = "Receipts".to_string();
        assert!(store.replace(&t.id, &renamed).await.unwrap());
        assert_eq!(
            TaskRepository::get(&store, &t.id).await.unwrap().unwrap().name,
            "Receipts"
        );

        assert!(TaskRepository::delete(&store, &t.id).await.unwrap());
        assert!(TaskRepository::get(&store, &t.id).await.unwrap().is_none());
    }
}
