use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{Value, json};

use crate::reasoning::{
    credentials::resolve_auth_header,
    error::{ReasoningError, schema_mismatch, timeout, unavailable},
    ports::ReasoningPort,
    types::{ReasoningBackendConfig, ReasoningRequest, ReasoningResponse},
};

/// Reasoning port backed by an OpenAI-compatible `/chat/completions` endpoint
/// in JSON-object mode.
#[derive(Clone)]
pub struct OpenAiCompatibleReasoner {
    client: Client,
    backend: ReasoningBackendConfig,
}

impl OpenAiCompatibleReasoner {
    pub fn new(backend: ReasoningBackendConfig) -> Result<Self, ReasoningError> {
        if backend.endpoint.trim().is_empty() {
            return Err(
                unavailable("openai-compatible backend requires endpoint").with_retryable(false)
            );
        }
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| {
                unavailable(format!("failed to build http client: {err}")).with_retryable(false)
            })?;
        Ok(Self { client, backend })
    }
}

#[async_trait]
impl ReasoningPort for OpenAiCompatibleReasoner {
    async fn reason(
        &self,
        request: ReasoningRequest,
    ) -> Result<ReasoningResponse, ReasoningError> {
        let url = format!(
            "{}/chat/completions",
            self.backend.endpoint.trim_end_matches('/')
        );

        let mut body = json!({
            "model": self.backend.model,
            "messages": [
                {"role": "system", "content": system_prompt(&request)},
                {"role": "user", "content": request.context.to_string()},
            ],
            "response_format": {"type": "json_object"},
            "stream": false,
        });
        if let Some(temperature) = self.backend.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = self.backend.max_output_tokens {
            body["max_tokens"] = Value::Number(max_tokens.into());
        }

        let mut req_builder = self
            .client
            .post(url)
            .timeout(request.timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-request-id", request.request_id.as_str())
            .json(&body);
        if let Some(auth_header) = resolve_auth_header(&self.backend.credential)? {
            req_builder = req_builder.header(header::AUTHORIZATION, auth_header);
        }

        let response = req_builder.send().await.map_err(map_transport_error)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body));
        }

        let payload: Value = response.json().await.map_err(|err| {
            if err.is_timeout() {
                timeout(format!("reading reasoning response timed out: {err}"))
            } else {
                schema_mismatch(format!("reasoning response is not json: {err}"))
            }
        })?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| schema_mismatch("reasoning response has no message content"))?;

        parse_envelope(content)
    }
}

fn system_prompt(request: &ReasoningRequest) -> String {
    format!(
        "{}\n\nRespond with one JSON object of the form \
         {{\"result\": <value>, \"confidence\": <number between 0 and 1>}} \
         where <value> satisfies this JSON schema:\n{}",
        request.instruction, request.schema
    )
}

fn parse_envelope(content: &str) -> Result<ReasoningResponse, ReasoningError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str::<ReasoningResponse>(unfenced)
        .map_err(|err| schema_mismatch(format!("reasoning envelope is malformed: {err}")))
}

fn map_transport_error(err: reqwest::Error) -> ReasoningError {
    if err.is_timeout() {
        return timeout(format!("reasoning request timed out: {err}"));
    }
    unavailable(format!("reasoning request failed: {err}"))
}

fn map_http_error(status: u16, body: &str) -> ReasoningError {
    let normalized_body = body.chars().take(240).collect::<String>();

    let mut err = if status == 401 || status == 403 {
        unavailable(format!("reasoning backend rejected credentials ({status})"))
            .with_retryable(false)
    } else if status == 408 {
        timeout(format!("reasoning backend returned status {status}"))
    } else if status == 429 {
        unavailable(format!("reasoning backend returned status {status}"))
    } else if (400..500).contains(&status) {
        unavailable(format!("reasoning backend returned status {status}")).with_retryable(false)
    } else {
        unavailable(format!("reasoning backend returned status {status}"))
    };

    if !normalized_body.is_empty() {
        err.message = format!("{}: {}", err.message, normalized_body);
    }
    err
}
