use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::core::questionnaire::Questionnaire;

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[cfg(test)]
pub(crate) struct FixedClock(pub std::sync::Mutex<NaiveDateTime>);

#[cfg(test)]
impl FixedClock {
    pub fn at(ts: &str) -> Self {
        Self(std::sync::Mutex::new(
            NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").expect("valid timestamp"),
        ))
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.0.lock().unwrap();
        *now += chrono::Duration::seconds(secs);
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

/// A script that has been written out for one start request.
#[derive(Debug, Clone)]
pub struct CompiledFlow {
    pub source_questionnaire_id: String,
    pub script_text: String,
    pub artifact_name: String,
    pub artifact_path: PathBuf,
    pub generated_at: NaiveDateTime,
}

/// Lower-cased title with spaces turned into underscores. Path separators
/// become underscores too so the artifact stays inside the flows directory.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

pub struct FlowPublisher {
    dir: PathBuf,
    extension: String,
    clock: Arc<dyn Clock>,
}

impl FlowPublisher {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_name(&self, title: &str, at: NaiveDateTime) -> String {
        format!(
            "{}_{}_flow.{}",
            normalize_title(title),
            at.format("%Y%m%d_%H%M%S"),
            self.extension
        )
    }

    /// Writes the script under the flows directory. Two publishes of the same
    /// title within one second land on the same name; the later one wins.
    pub async fn publish(&self, questionnaire: &Questionnaire, script: &str) -> Result<CompiledFlow> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating flows directory {}", self.dir.display()))?;

        let generated_at = self.clock.now();
        let artifact_name = self.artifact_name(&questionnaire.title, generated_at);
        let artifact_path = self.dir.join(&artifact_name);

        // Stage then rename so readers never observe a partial script.
        let staging = self.dir.join(format!(".{}.tmp", artifact_name));
        tokio::fs::write(&staging, script)
            .await
            .with_context(|| format!("writing {}", staging.display()))?;
        tokio::fs::rename(&staging, &artifact_path)
            .await
            .with_context(|| format!("moving flow into {}", artifact_path.display()))?;

        info!(
            "Published flow for questionnaire [{}] to {}",
            questionnaire.id,
            artifact_path.display()
        );

        Ok(CompiledFlow {
            source_questionnaire_id: questionnaire.id.clone(),
            script_text: script.to_string(),
            artifact_name,
            artifact_path,
            generated_at,
        })
    }
}
