use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Mutex;

use super::{
    Flow, FlowSpec, VoiceDeployment, VoiceDeploymentSpec, VoicePlatform, Worker, WorkerSpec,
};

#[derive(Debug, Clone)]
pub enum VoiceOutcome {
    Deployed,
    Empty,
    Raise(String),
}

#[derive(Debug, Clone, Default)]
pub struct RecordedCalls {
    pub workers: Vec<WorkerSpec>,
    pub flows: Vec<FlowSpec>,
    pub deployments: Vec<VoiceDeploymentSpec>,
}

/// In-process platform that records every call and numbers the ids it hands out.
pub struct MockPlatform {
    outcome: VoiceOutcome,
    worker_error: Option<String>,
    calls: Mutex<RecordedCalls>,
}

impl MockPlatform {
    pub fn new(outcome: VoiceOutcome) -> Self {
        Self {
            outcome,
            worker_error: None,
            calls: Mutex::new(RecordedCalls::default()),
        }
    }

    pub fn failing_worker(message: &str) -> Self {
        Self {
            outcome: VoiceOutcome::Deployed,
            worker_error: Some(message.to_string()),
            calls: Mutex::new(RecordedCalls::default()),
        }
    }

    pub fn calls(&self) -> RecordedCalls {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VoicePlatform for MockPlatform {
    async fn create_worker(&self, spec: &WorkerSpec) -> Result<Worker> {
        let mut calls = self.calls.lock().unwrap();
        calls.workers.push(spec.clone());
        if let Some(msg) = &self.worker_error {
            return Err(anyhow!("{}", msg));
        }
        Ok(Worker {
            id: format!("worker-{}", calls.workers.len()),
        })
    }

    async fn create_flow(&self, spec: &FlowSpec) -> Result<Flow> {
        let mut calls = self.calls.lock().unwrap();
        calls.flows.push(spec.clone());
        Ok(Flow {
            id: format!("flow-{}", calls.flows.len()),
        })
    }

    async fn create_voice_deployment(
        &self,
        spec: &VoiceDeploymentSpec,
    ) -> Result<Option<VoiceDeployment>> {
        let mut calls = self.calls.lock().unwrap();
        calls.deployments.push(spec.clone());
        match &self.outcome {
            VoiceOutcome::Deployed => Ok(Some(VoiceDeployment {
                id: format!("deployment-{}", calls.deployments.len()),
                phone_number: spec.phone_number.clone(),
            })),
            VoiceOutcome::Empty => Ok(None),
            VoiceOutcome::Raise(msg) => Err(anyhow!("{}", msg)),
        }
    }
}
