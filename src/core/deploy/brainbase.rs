use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::{
    Flow, FlowSpec, VoiceDeployment, VoiceDeploymentSpec, VoicePlatform, Worker, WorkerSpec,
};

#[derive(Serialize)]
struct CreateWorkerRequest<'a> {
    name: &'a str,
    description: &'a str,
    status: &'a str,
}

#[derive(Serialize)]
struct CreateFlowRequest<'a> {
    name: &'a str,
    path: String,
    code: String,
    label: &'a str,
    validate: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateVoiceDeploymentRequest<'a> {
    name: &'a str,
    flow_id: &'a str,
    phone_number: &'a str,
    config: &'a Value,
}

/// HTTP client for the Brainbase worker API. Uses reqwest defaults: no
/// request timeout and no retries.
pub struct BrainbaseClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl BrainbaseClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;
        let status = res.status();
        if !status.is_success() {
            return Err(anyhow!(
                "Brainbase API Error ({}): {}",
                status,
                res.text().await.unwrap_or_default()
            ));
        }
        let text = res.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Some endpoints wrap the object in `{"data": ...}`.
fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") && !map.contains_key("id") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match value.get(*k) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn require_id(value: &Value, what: &str) -> Result<String> {
    string_field(value, &["id"]).ok_or_else(|| anyhow!("{} response carried no id: {}", what, value))
}

#[async_trait]
impl VoicePlatform for BrainbaseClient {
    async fn create_worker(&self, spec: &WorkerSpec) -> Result<Worker> {
        let body = CreateWorkerRequest {
            name: &spec.name,
            description: &spec.description,
            status: &spec.status,
        };
        let value = unwrap_data(self.post_json("/api/workers", &body).await?);
        Ok(Worker {
            id: require_id(&value, "worker")?,
        })
    }

    async fn create_flow(&self, spec: &FlowSpec) -> Result<Flow> {
        let code = tokio::fs::read_to_string(&spec.path)
            .await
            .with_context(|| format!("reading flow artifact {}", spec.path.display()))?;
        let body = CreateFlowRequest {
            name: &spec.name,
            path: spec.path.to_string_lossy().to_string(),
            code,
            label: &spec.label,
            validate: spec.validate,
        };
        let path = format!("/api/workers/{}/flows", spec.worker_id);
        let value = unwrap_data(self.post_json(&path, &body).await?);
        Ok(Flow {
            id: require_id(&value, "flow")?,
        })
    }

    async fn create_voice_deployment(
        &self,
        spec: &VoiceDeploymentSpec,
    ) -> Result<Option<VoiceDeployment>> {
        let body = CreateVoiceDeploymentRequest {
            name: &spec.name,
            flow_id: &spec.flow_id,
            phone_number: &spec.phone_number,
            config: &spec.config,
        };
        let path = format!("/api/workers/{}/deployments/voice", spec.worker_id);
        let value = unwrap_data(self.post_json(&path, &body).await?);

        let Some(id) = string_field(&value, &["id"]) else {
            return Ok(None);
        };
        let phone_number = string_field(&value, &["phoneNumber", "phone_number"])
            .unwrap_or_else(|| spec.phone_number.clone());
        Ok(Some(VoiceDeployment { id, phone_number }))
    }
}
