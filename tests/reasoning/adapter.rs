use std::time::Duration;

use healer::reasoning::{
    ReasoningErrorKind, ReasoningPort, ReasoningRequest, ReasoningStage,
    adapters::openai_compatible::OpenAiCompatibleReasoner,
    credentials::CredentialRef,
    types::ReasoningBackendConfig,
};
use serde_json::json;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::oneshot,
};

fn backend(endpoint: String) -> ReasoningBackendConfig {
    ReasoningBackendConfig {
        endpoint,
        model: "incident-model".to_string(),
        credential: CredentialRef::InlineToken {
            token: "test-token".to_string(),
        },
        temperature: Some(0.0),
        max_output_tokens: None,
    }
}

fn request() -> ReasoningRequest {
    ReasoningRequest {
        request_id: "INC-H1:diagnosis:0".to_string(),
        incident_id: "INC-H1".to_string(),
        stage: ReasoningStage::Diagnosis,
        instruction: "diagnose".to_string(),
        context: json!({"incident": {"description": "api-gateway 502s"}}),
        schema: json!({"type": "object"}),
        timeout: Duration::from_secs(5),
    }
}

/// Serves exactly one HTTP response and hands back the raw request it received.
async fn serve_once(status_line: &'static str, body: String) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let address = listener.local_addr().expect("listener has an address");
    let (seen_tx, seen_rx) = oneshot::channel();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut raw = Vec::new();
        let mut chunk = [0_u8; 4096];
        loop {
            let Ok(read) = socket.read(&mut chunk).await else {
                return;
            };
            if read == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..read]);
            if request_complete(&raw) {
                break;
            }
        }
        let _ = seen_tx.send(String::from_utf8_lossy(&raw).to_string());

        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    (format!("http://{address}/v1"), seen_rx)
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    raw.len() >= header_end + 4 + content_length
}

#[tokio::test]
async fn given_json_envelope_reply_when_reasoning_then_result_and_confidence_are_returned() {
    let envelope = json!({
        "result": {"hypotheses": [{"description": "connection pool exhausted", "confidence": 0.8}]},
        "confidence": 0.85,
    });
    let completion = json!({
        "choices": [{"message": {"role": "assistant", "content": envelope.to_string()}}]
    });
    let (endpoint, seen) = serve_once("200 OK", completion.to_string()).await;

    let reasoner = OpenAiCompatibleReasoner::new(backend(endpoint)).expect("backend is valid");
    let response = reasoner.reason(request()).await.expect("reply should parse");

    assert_eq!(response.confidence, 0.85);
    assert_eq!(
        response.result["hypotheses"][0]["description"],
        "connection pool exhausted"
    );

    let raw_request = seen.await.expect("server saw the request");
    assert!(raw_request.starts_with("POST /v1/chat/completions"));
    assert!(raw_request.to_ascii_lowercase().contains("authorization: bearer test-token"));
    assert!(raw_request.contains("\"json_object\""));
}

#[tokio::test]
async fn given_server_error_when_reasoning_then_error_is_retryable_unavailable() {
    let (endpoint, _seen) = serve_once("503 Service Unavailable", "{}".to_string()).await;
    let reasoner = OpenAiCompatibleReasoner::new(backend(endpoint)).expect("backend is valid");

    let err = reasoner.reason(request()).await.expect_err("503 must fail");
    assert_eq!(err.kind, ReasoningErrorKind::Unavailable);
    assert!(err.retryable);
}

#[tokio::test]
async fn given_reply_without_envelope_when_reasoning_then_schema_mismatch() {
    let completion = json!({
        "choices": [{"message": {"role": "assistant", "content": "I think it is the database."}}]
    });
    let (endpoint, _seen) = serve_once("200 OK", completion.to_string()).await;
    let reasoner = OpenAiCompatibleReasoner::new(backend(endpoint)).expect("backend is valid");

    let err = reasoner.reason(request()).await.expect_err("prose is not an envelope");
    assert_eq!(err.kind, ReasoningErrorKind::SchemaMismatch);
    assert!(!err.retryable);
}

#[tokio::test]
async fn given_blank_endpoint_when_constructing_then_backend_is_rejected() {
    let err = match OpenAiCompatibleReasoner::new(backend("  ".to_string())) {
        Ok(_) => panic!("blank endpoint should fail"),
        Err(err) => err,
    };
    assert_eq!(err.kind, ReasoningErrorKind::Unavailable);
    assert!(!err.retryable);
}
