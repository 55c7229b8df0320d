use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    reasoning::{credentials::CredentialRef, retry::RetryPolicy},
    types::{Confidence, IncidentId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningStage {
    Classification,
    Diagnosis,
    Planning,
}

impl ReasoningStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasoningStage::Classification => "classification",
            ReasoningStage::Diagnosis => "diagnosis",
            ReasoningStage::Planning => "planning",
        }
    }
}

/// One call to the external reasoning capability.
///
/// `context` is the prompt context, `schema` is the JSON schema the structured
/// result must satisfy and `timeout` is the slice the port must honor.
#[derive(Debug, Clone)]
pub struct ReasoningRequest {
    pub request_id: String,
    pub incident_id: IncidentId,
    pub stage: ReasoningStage,
    pub instruction: String,
    pub context: Value,
    pub schema: Value,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningResponse {
    pub result: Value,
    pub confidence: f64,
}

/// A response that passed schema and confidence validation.
#[derive(Debug, Clone)]
pub struct ReasoningOutcome {
    pub result: Value,
    pub confidence: Confidence,
    pub attempts: u32,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_backoff_base_ms() -> u64 {
    200
}

fn default_backoff_max_ms() -> u64 {
    2_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningBackendConfig {
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub credential: CredentialRef,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_output_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default)]
    pub backend: Option<ReasoningBackendConfig>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            backend: None,
            request_timeout_ms: default_request_timeout_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

impl ReasoningConfig {
    pub fn retry_policy(&self, max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            call_timeout: Duration::from_millis(self.request_timeout_ms.max(1)),
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_max: Duration::from_millis(self.backoff_max_ms),
        }
    }
}
