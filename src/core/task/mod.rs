mod export;
mod processor;
mod runner;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use export::{export_results, render_csv};
pub use processor::{DocumentProcessor, ExtractedDocument, SimulatedProcessor};
pub use runner::TaskRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

fn default_name() -> String {
    "New Task".to_string()
}
fn default_source_type() -> String {
    "google_drive".to_string()
}
fn default_output_type() -> String {
    "google_sheets".to_string()
}

/// Document-processing job. Field names follow the dashboard's camelCase JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub source_type: String,
    pub source_path: String,
    pub output_type: String,
    pub output_path: String,
    pub google_api_key: String,
    pub google_credentials: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

/// Client-supplied task fields; anything missing takes the dashboard default.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_source_type")]
    pub source_type: String,
    #[serde(default)]
    pub source_path: String,
    #[serde(default = "default_output_type")]
    pub output_type: String,
    #[serde(default)]
    pub output_path: String,
    #[serde(default)]
    pub google_api_key: String,
    #[serde(default)]
    pub google_credentials: String,
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    pub fn create(input: TaskInput) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name,
            source_type: input.source_type,
            source_path: input.source_path,
            output_type: input.output_type,
            output_path: input.output_path,
            google_api_key: input.google_api_key,
            google_credentials: input.google_credentials,
            status: input.status,
            created_at: Utc::now(),
        }
    }

    /// Replacement that preserves identity and creation time.
    pub fn revise(&self, input: TaskInput) -> Self {
        Self {
            id: self.id.clone(),
            created_at: self.created_at,
            ..Task::create(input)
        }
    }
}
