mod brainbase;
#[cfg(test)]
pub(crate) mod mock;

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::questionnaire::Questionnaire;

pub use brainbase::BrainbaseClient;

/// Every flow is registered under this version label.
pub const FLOW_LABEL: &str = "v1";

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct WorkerSpec {
    pub name: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FlowSpec {
    pub worker_id: String,
    pub name: String,
    pub path: PathBuf,
    pub label: String,
    pub validate: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct VoiceDeploymentSpec {
    pub worker_id: String,
    pub name: String,
    pub flow_id: String,
    pub phone_number: String,
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Worker {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceDeployment {
    pub id: String,
    pub phone_number: String,
}

/// Remote worker-orchestration platform.
#[async_trait]
pub trait VoicePlatform: Send + Sync {
    async fn create_worker(&self, spec: &WorkerSpec) -> Result<Worker>;

    async fn create_flow(&self, spec: &FlowSpec) -> Result<Flow>;

    /// `Ok(None)` means the platform answered but produced no deployment.
    async fn create_voice_deployment(
        &self,
        spec: &VoiceDeploymentSpec,
    ) -> Result<Option<VoiceDeployment>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Success,
    Failure,
    Error,
}

impl DeploymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentStatus::Success => "success",
            DeploymentStatus::Failure => "failure",
            DeploymentStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DeploymentResult {
    pub status: DeploymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub message: String,
}

impl DeploymentResult {
    fn unset(status: DeploymentStatus, message: String) -> Self {
        Self {
            status,
            worker_id: None,
            flow_id: None,
            deployment_id: None,
            phone_number: None,
            message,
        }
    }
}

pub struct DeploymentOrchestrator {
    platform: Arc<dyn VoicePlatform>,
    phone_number: String,
}

impl DeploymentOrchestrator {
    pub fn new(platform: Arc<dyn VoicePlatform>, phone_number: impl Into<String>) -> Self {
        Self {
            platform,
            phone_number: phone_number.into(),
        }
    }

    /// Worker, flow, then voice deployment. A later failure leaves earlier
    /// remote objects in place.
    pub async fn deploy(&self, questionnaire: &Questionnaire, artifact: &Path) -> DeploymentResult {
        match self.run_steps(questionnaire, artifact).await {
            Ok(Some((worker, flow, deployment))) => {
                info!(
                    "Deployed questionnaire [{}] to {}",
                    questionnaire.id, deployment.phone_number
                );
                DeploymentResult {
                    status: DeploymentStatus::Success,
                    message: format!(
                        "Successfully deployed {} to {}",
                        questionnaire.title, deployment.phone_number
                    ),
                    worker_id: Some(worker.id),
                    flow_id: Some(flow.id),
                    deployment_id: Some(deployment.id),
                    phone_number: Some(deployment.phone_number),
                }
            }
            Ok(None) => {
                warn!(
                    "Platform returned no voice deployment for questionnaire [{}]",
                    questionnaire.id
                );
                DeploymentResult::unset(
                    DeploymentStatus::Failure,
                    format!("Failed to deploy {}", questionnaire.title),
                )
            }
            Err(e) => {
                error!(
                    "Deployment of questionnaire [{}] failed: {:#}",
                    questionnaire.id, e
                );
                DeploymentResult::unset(DeploymentStatus::Error, format!("Deployment error: {:#}", e))
            }
        }
    }

    async fn run_steps(
        &self,
        questionnaire: &Questionnaire,
        artifact: &Path,
    ) -> Result<Option<(Worker, Flow, VoiceDeployment)>> {
        let title = &questionnaire.title;

        let worker = self
            .platform
            .create_worker(&WorkerSpec {
                name: title.clone(),
                description: format!("Voice assistant for the {} questionnaire", title),
                status: "active".to_string(),
            })
            .await?;
        info!("Created worker {} for questionnaire [{}]", worker.id, questionnaire.id);

        let flow = self
            .platform
            .create_flow(&FlowSpec {
                worker_id: worker.id.clone(),
                name: title.clone(),
                path: artifact.to_path_buf(),
                label: FLOW_LABEL.to_string(),
                validate: false,
            })
            .await?;
        info!("Registered flow {} on worker {}", flow.id, worker.id);

        let deployment = self
            .platform
            .create_voice_deployment(&VoiceDeploymentSpec {
                worker_id: worker.id.clone(),
                name: format!("{} Voice Deployment", title),
                flow_id: flow.id.clone(),
                phone_number: self.phone_number.clone(),
                config: serde_json::json!({}),
            })
            .await?;

        Ok(deployment.map(|d| (worker, flow, d)))
    }
}
