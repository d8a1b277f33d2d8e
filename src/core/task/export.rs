use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

use super::{ExtractedDocument, Task};

const CSV_HEADER: &str = "Filename,Name,Date,Address,Full Text";

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn render_csv(docs: &[ExtractedDocument]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for doc in docs {
        let row = [
            doc.filename.as_str(),
            doc.field("name"),
            doc.field("date"),
            doc.field("address"),
            doc.text.as_str(),
        ]
        .iter()
        .map(|v| csv_field(v))
        .collect::<Vec<_>>()
        .join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}

/// Writes results to the task's output target and returns the file written,
/// if any.
pub async fn export_results(task: &Task, docs: &[ExtractedDocument]) -> Result<Option<PathBuf>> {
    match task.output_type.as_str() {
        "csv" => {
            let path = if task.output_path.is_empty() {
                PathBuf::from(format!("task_{}.csv", task.id))
            } else {
                PathBuf::from(&task.output_path)
            };
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, render_csv(docs))
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Exported {} documents to {}", docs.len(), path.display());
            Ok(Some(path))
        }
        "google_sheets" => {
            info!(
                "Would export {} documents to Google Sheet {}",
                docs.len(),
                task.output_path
            );
            Ok(None)
        }
        other => {
            warn!("Unknown output type '{}' for task {}", other, task.id);
            Ok(None)
        }
    }
}
