use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{DocumentProcessor, Task, TaskStatus, export_results};
use crate::core::lifecycle::LifecycleComponent;
use crate::core::store::TaskRepository;

/// Runs document-processing tasks in the background and records their outcome.
#[derive(Clone)]
pub struct TaskRunner {
    repo: Arc<dyn TaskRepository>,
    processor: Arc<dyn DocumentProcessor>,
    handles: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl TaskRunner {
    pub fn new(repo: Arc<dyn TaskRepository>, processor: Arc<dyn DocumentProcessor>) -> Self {
        Self {
            repo,
            processor,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Marks the task in progress and spawns its run. Returns false when the
    /// task does not exist.
    pub async fn start(&self, id: &str) -> Result<bool> {
        let Some(task) = self.repo.get(id).await? else {
            return Ok(false);
        };
        self.repo.set_status(id, TaskStatus::InProgress).await?;
        info!("Task {} ({}) started", task.id, task.name);

        let repo = self.repo.clone();
        let processor = self.processor.clone();
        let handle = tokio::spawn(run_task(repo, processor, task));

        let mut handles = self.handles.lock().await;
        handles.retain(|_, h| !h.is_finished());
        if let Some(previous) = handles.insert(id.to_string(), handle) {
            warn!("Task {} restarted while a previous run was active", id);
            previous.abort();
        }
        Ok(true)
    }

    /// Waits for the latest run of `id` to finish.
    pub async fn wait(&self, id: &str) {
        let handle = self.handles.lock().await.remove(id);
        if let Some(handle) = handle
            && let Err(e) = handle.await
            && !e.is_cancelled()
        {
            error!("Task {} run panicked: {}", id, e);
        }
    }

    /// Aborts unfinished runs and marks them failed so no task is left
    /// `in_progress` once the server is gone.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, JoinHandle<()>)> = self.handles.lock().await.drain().collect();
        for (id, handle) in drained {
            if handle.is_finished() {
                continue;
            }
            warn!("Aborting task {} on shutdown", id);
            handle.abort();
            // A run that got to record its own status before the abort landed keeps it.
            let Err(e) = handle.await else { continue };
            if !e.is_cancelled() {
                error!("Task {} run panicked: {}", id, e);
            }
            if let Err(e) = self.repo.set_status(&id, TaskStatus::Failed).await {
                error!("Failed to record status for task {}: {}", id, e);
            }
        }
    }
}

async fn run_task(
    repo: Arc<dyn TaskRepository>,
    processor: Arc<dyn DocumentProcessor>,
    task: Task,
) {
    let outcome: Result<usize> = async {
        let docs = processor.process(&task).await?;
        if let Some(path) = export_results(&task, &docs).await? {
            repo.set_output_path(&task.id, &path.to_string_lossy())
                .await?;
        }
        Ok(docs.len())
    }
    .await;

    let status = match outcome {
        Ok(count) => {
            info!("Task {} completed: {} documents processed", task.id, count);
            TaskStatus::Completed
        }
        Err(e) => {
            error!("Task {} failed: {:#}", task.id, e);
            TaskStatus::Failed
        }
    };
    if let Err(e) = repo.set_status(&task.id, status).await {
        error!("Failed to record status for task {}: {}", task.id, e);
    }
}

#[async_trait::async_trait]
impl LifecycleComponent for TaskRunner {
    async fn on_shutdown(&mut self) -> Result<()> {
        self.shutdown().await;
        Ok(())
    }
}
