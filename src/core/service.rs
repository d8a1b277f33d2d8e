use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};

use crate::core::deploy::{DeploymentOrchestrator, DeploymentResult, DeploymentStatus};
use crate::core::flow::{self, FlowPublisher};
use crate::core::questionnaire::{
    NewQuestionnaire, Questionnaire, QuestionnaireStatus, can_transition, status_after_deployment,
};
use crate::core::store::QuestionnaireRepository;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Questionnaire not found")]
    NotFound,
    #[error("Failed to generate questionnaire flow: {0:#}")]
    Publish(anyhow::Error),
    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
    #[error("Questionnaire {0} is already running")]
    AlreadyRunning(String),
    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Body returned by a start request. `status` is "error" when deployment did
/// not succeed even though the flow was written.
#[derive(Debug, Clone, Serialize)]
pub struct StartReport {
    pub questionnaire_id: String,
    pub file_path: String,
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitReport {
    pub questionnaire_id: String,
    pub status: &'static str,
    pub message: &'static str,
}

/// Removes its id from the in-flight set when the start request ends.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.id);
    }
}

pub struct QuestionnaireService {
    repo: Arc<dyn QuestionnaireRepository>,
    publisher: FlowPublisher,
    orchestrator: Option<DeploymentOrchestrator>,
    reject_running_starts: bool,
    in_flight: Mutex<HashSet<String>>,
}

impl QuestionnaireService {
    pub fn new(
        repo: Arc<dyn QuestionnaireRepository>,
        publisher: FlowPublisher,
        orchestrator: Option<DeploymentOrchestrator>,
    ) -> Self {
        Self {
            repo,
            publisher,
            orchestrator,
            reject_running_starts: false,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn reject_running_starts(mut self, reject: bool) -> Self {
        self.reject_running_starts = reject;
        self
    }

    pub async fn create(&self, input: NewQuestionnaire) -> Result<Questionnaire, ServiceError> {
        let questionnaire = Questionnaire::create(input);
        self.repo.insert(&questionnaire).await?;
        info!(
            "Created questionnaire [{}] '{}'",
            questionnaire.id, questionnaire.title
        );
        Ok(questionnaire)
    }

    pub async fn list(&self) -> Result<Vec<Questionnaire>, ServiceError> {
        Ok(self.repo.list().await?)
    }

    pub async fn get(&self, id: &str) -> Result<Questionnaire, ServiceError> {
        self.repo.get(id).await?.ok_or(ServiceError::NotFound)
    }

    pub async fn replace(
        &self,
        id: &str,
        input: NewQuestionnaire,
    ) -> Result<Questionnaire, ServiceError> {
        let current = self.get(id).await?;
        let revised = current.revise(input);
        if !self.repo.replace(id, &revised).await? {
            return Err(ServiceError::NotFound);
        }
        Ok(revised)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        if self.repo.delete(id).await? {
            info!("Deleted questionnaire [{}]", id);
            Ok(())
        } else {
            Err(ServiceError::NotFound)
        }
    }

    pub async fn update_status(
        &self,
        id: &str,
        status: QuestionnaireStatus,
    ) -> Result<Questionnaire, ServiceError> {
        let mut questionnaire = self.get(id).await?;
        if !can_transition(questionnaire.status, status) {
            return Err(ServiceError::InvalidTransition {
                from: questionnaire.status.as_str(),
                to: status.as_str(),
            });
        }
        if questionnaire.status != status {
            info!(
                "Questionnaire [{}] status {} -> {}",
                id,
                questionnaire.status.as_str(),
                status.as_str()
            );
            questionnaire.status = status;
            self.repo.replace(id, &questionnaire).await?;
        }
        Ok(questionnaire)
    }

    /// Compile, publish and (when configured) deploy the questionnaire.
    pub async fn start(&self, id: &str) -> Result<StartReport, ServiceError> {
        let questionnaire = self.get(id).await?;

        let guard = self.claim(id);
        if self.reject_running_starts
            && (guard.is_none() || questionnaire.status == QuestionnaireStatus::Running)
        {
            warn!("Rejected start for questionnaire [{}]: already running", id);
            return Err(ServiceError::AlreadyRunning(id.to_string()));
        }

        let script = flow::compile(&questionnaire);
        info!(
            "Compiled questionnaire [{}] ({} questions)",
            id,
            questionnaire.questions.len()
        );
        let compiled = self
            .publisher
            .publish(&questionnaire, &script)
            .await
            .map_err(ServiceError::Publish)?;
        let file_path = compiled.artifact_path.display().to_string();

        let Some(orchestrator) = &self.orchestrator else {
            return Ok(StartReport {
                questionnaire_id: questionnaire.id,
                file_path,
                status: "success",
                message: "Questionnaire flow generated successfully".to_string(),
                deployment: None,
            });
        };

        let deployment = orchestrator
            .deploy(&questionnaire, &compiled.artifact_path)
            .await;
        info!(
            "Deployment for questionnaire [{}] finished: {}",
            id,
            deployment.status.as_str()
        );

        if deployment.status == DeploymentStatus::Success {
            self.promote(id).await?;
        }
        drop(guard);

        Ok(StartReport {
            questionnaire_id: questionnaire.id,
            file_path,
            status: if deployment.status == DeploymentStatus::Success {
                "success"
            } else {
                "error"
            },
            message: deployment.message.clone(),
            deployment: Some(deployment),
        })
    }

    /// Answers are acknowledged but not stored.
    pub async fn submit(&self, id: &str, answers: &Value) -> Result<SubmitReport, ServiceError> {
        let questionnaire = self.get(id).await?;
        let count = match answers {
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            Value::Null => 0,
            _ => 1,
        };
        info!(
            "Received {} answers for questionnaire [{}]",
            count, questionnaire.id
        );
        Ok(SubmitReport {
            questionnaire_id: questionnaire.id,
            status: "success",
            message: "Questionnaire submitted successfully",
        })
    }

    async fn promote(&self, id: &str) -> Result<(), ServiceError> {
        // Re-read so a concurrent status update is not overwritten.
        let Some(mut latest) = self.repo.get(id).await? else {
            warn!("Questionnaire [{}] vanished before status update", id);
            return Ok(());
        };
        let next = status_after_deployment(latest.status, DeploymentStatus::Success);
        if next == latest.status {
            if latest.status.is_terminal() {
                warn!(
                    "Questionnaire [{}] is {}; keeping terminal status after deployment",
                    id,
                    latest.status.as_str()
                );
            }
            return Ok(());
        }
        latest.status = next;
        self.repo.replace(id, &latest).await?;
        info!("Questionnaire [{}] is now {}", id, next.as_str());
        Ok(())
    }

    fn claim(&self, id: &str) -> Option<InFlight<'_>> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(id.to_string()) {
            return None;
        }
        Some(InFlight {
            set: &self.in_flight,
            id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::deploy::mock::{MockPlatform, VoiceOutcome};
    use crate::core::flow::FixedClock;
    use crate::core::questionnaire::{Question, QuestionType};
    use crate::core::store::Store;
    use std::path::PathBuf;

    struct Harness {
        _tmp: tempfile::TempDir,
        flows: PathBuf,
        clock: Arc<FixedClock>,
        platform: Arc<MockPlatform>,
        service: QuestionnaireService,
    }

    fn harness(deploy: Option<VoiceOutcome>) -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let flows = tmp.path().join("flows");
        let clock = Arc::new(FixedClock::at("2024-03-01 10:00:00"));
        let platform = Arc::new(MockPlatform::new(
            deploy.clone().unwrap_or(VoiceOutcome::Deployed),
        ));
        let orchestrator =
            deploy.map(|_| DeploymentOrchestrator::new(platform.clone(), "+15550100"));
        let service = QuestionnaireService::new(
            Arc::new(Store::in_memory().unwrap()),
            FlowPublisher::new(&flows, "based", clock.clone()),
            orchestrator,
        );
        Harness {
            _tmp: tmp,
            flows,
            clock,
            platform,
            service,
        }
    }

    fn survey() -> NewQuestionnaire {
        NewQuestionnaire {
            title: "Customer Survey".to_string(),
            questions: vec![Question {
                text: "How was your visit?".to_string(),
                kind: QuestionType::Rating,
                options: vec![],
            }],
        }
    }

    #[tokio::test]
    async fn create_starts_not_started() {
        let h = harness(None);
        let q = h.service.create(survey()).await.unwrap();
        assert_eq!(q.status, QuestionnaireStatus::NotStarted);
        assert_eq!(h.service.get(&q.id).await.unwrap(), q);
        assert_eq!(h.service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn start_unknown_id_has_no_side_effects() {
        let h = harness(Some(VoiceOutcome::Deployed));
        let err = h.service.start("missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
        assert!(!h.flows.exists());
        assert!(h.platform.calls().workers.is_empty());
    }

    #[tokio::test]
    async fn start_without_deployment_only_generates() {
        let h = harness(None);
        let q = h.service.create(survey()).await.unwrap();

        let report = h.service.start(&q.id).await.unwrap();
        assert_eq!(report.status, "success");
        assert_eq!(report.message, "Questionnaire flow generated successfully");
        assert!(report.deployment.is_none());
        assert!(report.file_path.ends_with("customer_survey_20240301_100000_flow.based"));

        let script = std::fs::read_to_string(&report.file_path).unwrap();
        assert_eq!(script, flow::compile(&q));

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("deployment").is_none());
        assert_eq!(
            h.service.get(&q.id).await.unwrap().status,
            QuestionnaireStatus::NotStarted
        );
    }

    #[tokio::test]
    async fn successful_deployment_sets_running() {
        let h = harness(Some(VoiceOutcome::Deployed));
        let q = h.service.create(survey()).await.unwrap();

        let report = h.service.start(&q.id).await.unwrap();
        assert_eq!(report.status, "success");
        assert_eq!(report.message, "Successfully deployed Customer Survey to +15550100");
        let deployment = report.deployment.unwrap();
        assert_eq!(deployment.deployment_id.as_deref(), Some("deployment-1"));
        assert_eq!(
            h.service.get(&q.id).await.unwrap().status,
            QuestionnaireStatus::Running
        );
    }

    #[tokio::test]
    async fn failed_deployment_reports_error_and_keeps_status() {
        let h = harness(Some(VoiceOutcome::Raise("line busy".to_string())));
        let q = h.service.create(survey()).await.unwrap();

        let report = h.service.start(&q.id).await.unwrap();
        assert_eq!(report.status, "error");
        assert_eq!(report.message, "Deployment error: line busy");
        assert_eq!(
            report.deployment.map(|d| d.status),
            Some(DeploymentStatus::Error)
        );
        assert!(std::path::Path::new(&report.file_path).exists());
        assert_eq!(
            h.service.get(&q.id).await.unwrap().status,
            QuestionnaireStatus::NotStarted
        );
    }

    #[tokio::test]
    async fn empty_voice_deployment_is_a_failure() {
        let h = harness(Some(VoiceOutcome::Empty));
        let q = h.service.create(survey()).await.unwrap();

        let report = h.service.start(&q.id).await.unwrap();
        assert_eq!(report.status, "error");
        assert_eq!(report.message, "Failed to deploy Customer Survey");
    }

    #[tokio::test]
    async fn repeated_starts_each_run_fully() {
        let h = harness(Some(VoiceOutcome::Deployed));
        let q = h.service.create(survey()).await.unwrap();

        let first = h.service.start(&q.id).await.unwrap();
        h.clock.advance_secs(1);
        let second = h.service.start(&q.id).await.unwrap();

        assert_ne!(first.file_path, second.file_path);
        assert!(std::path::Path::new(&first.file_path).exists());
        assert!(std::path::Path::new(&second.file_path).exists());
        let calls = h.platform.calls();
        assert_eq!(calls.workers.len(), 2);
        assert_eq!(calls.flows.len(), 2);
        assert_eq!(calls.deployments.len(), 2);
        assert_eq!(
            h.service.get(&q.id).await.unwrap().status,
            QuestionnaireStatus::Running
        );
    }

    #[tokio::test]
    async fn toggle_rejects_start_of_running_questionnaire() {
        let mut h = harness(Some(VoiceOutcome::Deployed));
        h.service = QuestionnaireService::new(
            h.service.repo.clone(),
            FlowPublisher::new(&h.flows, "based", h.clock.clone()),
            Some(DeploymentOrchestrator::new(h.platform.clone(), "+15550100")),
        )
        .reject_running_starts(true);
        let q = h.service.create(survey()).await.unwrap();

        h.service.start(&q.id).await.unwrap();
        let err = h.service.start(&q.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyRunning(_)));
        assert_eq!(h.platform.calls().workers.len(), 1);
    }

    #[tokio::test]
    async fn toggle_rejects_start_already_in_flight() {
        let mut h = harness(None);
        h.service = QuestionnaireService::new(
            h.service.repo.clone(),
            FlowPublisher::new(&h.flows, "based", h.clock.clone()),
            None,
        )
        .reject_running_starts(true);
        let q = h.service.create(survey()).await.unwrap();

        let held = h.service.claim(&q.id);
        assert!(held.is_some());
        let err = h.service.start(&q.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyRunning(_)));

        drop(held);
        assert!(h.service.start(&q.id).await.is_ok());
    }

    #[tokio::test]
    async fn poisoned_in_flight_set_still_admits_starts() {
        let mut h = harness(None);
        h.service = QuestionnaireService::new(
            h.service.repo.clone(),
            FlowPublisher::new(&h.flows, "based", h.clock.clone()),
            None,
        )
        .reject_running_starts(true);
        let q = h.service.create(survey()).await.unwrap();

        let in_flight = &h.service.in_flight;
        std::thread::scope(|s| {
            let _ = s
                .spawn(move || {
                    let _guard = in_flight.lock().unwrap();
                    panic!("poison the in-flight set");
                })
                .join();
        });
        assert!(h.service.in_flight.is_poisoned());

        assert!(h.service.start(&q.id).await.is_ok());
        h.clock.advance_secs(1);
        assert!(h.service.start(&q.id).await.is_ok());
    }

    #[tokio::test]
    async fn terminal_status_survives_successful_deployment() {
        let h = harness(Some(VoiceOutcome::Deployed));
        let q = h.service.create(survey()).await.unwrap();
        h.service
            .update_status(&q.id, QuestionnaireStatus::Stopped)
            .await
            .unwrap();

        let report = h.service.start(&q.id).await.unwrap();
        assert_eq!(report.status, "success");
        assert_eq!(
            h.service.get(&q.id).await.unwrap().status,
            QuestionnaireStatus::Stopped
        );
    }

    #[tokio::test]
    async fn update_status_follows_lifecycle() {
        let h = harness(None);
        let q = h.service.create(survey()).await.unwrap();

        let err = h
            .service
            .update_status(&q.id, QuestionnaireStatus::Running)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));

        let done = h
            .service
            .update_status(&q.id, QuestionnaireStatus::Complete)
            .await
            .unwrap();
        assert_eq!(done.status, QuestionnaireStatus::Complete);

        assert!(h
            .service
            .update_status(&q.id, QuestionnaireStatus::Complete)
            .await
            .is_ok());
        let err = h
            .service
            .update_status(&q.id, QuestionnaireStatus::Stopped)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot change status from Complete to Stopped");
    }

    #[tokio::test]
    async fn replace_keeps_identity_and_status() {
        let h = harness(None);
        let q = h.service.create(survey()).await.unwrap();
        h.service
            .update_status(&q.id, QuestionnaireStatus::Stopped)
            .await
            .unwrap();

        let revised = h
            .service
            .replace(
                &q.id,
                NewQuestionnaire {
                    title: "Renamed".to_string(),
                    questions: vec![],
                },
            )
            .await
            .unwrap();
        assert_eq!(revised.id, q.id);
        assert_eq!(revised.created_at, q.created_at);
        assert_eq!(revised.status, QuestionnaireStatus::Stopped);
        assert_eq!(revised.title, "Renamed");

        assert!(matches!(
            h.service.replace("missing", survey()).await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let h = harness(None);
        let q = h.service.create(survey()).await.unwrap();
        h.service.delete(&q.id).await.unwrap();
        assert!(matches!(h.service.get(&q.id).await, Err(ServiceError::NotFound)));
        assert!(matches!(h.service.delete(&q.id).await, Err(ServiceError::NotFound)));
    }

    #[tokio::test]
    async fn submit_acknowledges_known_questionnaire() {
        let h = harness(None);
        let q = h.service.create(survey()).await.unwrap();

        let report = h
            .service
            .submit(&q.id, &serde_json::json!({"q1": 5}))
            .await
            .unwrap();
        assert_eq!(report.questionnaire_id, q.id);
        assert_eq!(report.message, "Questionnaire submitted successfully");

        assert!(matches!(
            h.service.submit("missing", &Value::Null).await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn publish_failure_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("flows");
        std::fs::write(&blocker, "not a directory").unwrap();
        let service = QuestionnaireService::new(
            Arc::new(Store::in_memory().unwrap()),
            FlowPublisher::new(&blocker, "based", Arc::new(FixedClock::at("2024-03-01 10:00:00"))),
            None,
        );
        let q = service.create(survey()).await.unwrap();
        assert!(matches!(
            service.start(&q.id).await,
            Err(ServiceError::Publish(_))
        ));
    }
}
