use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use super::Task;

/// Text and named fields pulled out of one source document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedDocument {
    pub filename: String,
    pub text: String,
    pub fields: BTreeMap<String, String>,
}

impl ExtractedDocument {
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    async fn process(&self, task: &Task) -> Result<Vec<ExtractedDocument>>;
}

/// Stand-in extractor that returns fixed placeholder documents.
pub struct SimulatedProcessor;

#[async_trait]
impl DocumentProcessor for SimulatedProcessor {
    async fn process(&self, task: &Task) -> Result<Vec<ExtractedDocument>> {
        info!(
            "Processing task {} from {} source {}",
            task.id, task.source_type, task.source_path
        );
        let docs = (1..=2)
            .map(|n| ExtractedDocument {
                filename: format!("sample_document_{}.jpg", n),
                text: "This is extracted text from the document.".to_string(),
                fields: BTreeMap::from([
                    ("name".to_string(), "John Doe".to_string()),
                    ("date".to_string(), "2023-01-15".to_string()),
                    ("address".to_string(), "123 Main St, Anytown, USA".to_string()),
                ]),
            })
            .collect();
        Ok(docs)
    }
}
