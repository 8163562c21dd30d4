//! Integration tests for the OpenAI-compatible provider
//!
//! Tests behavioral contracts against a mock HTTP server:
//! - request shape (auth header, model, messages)
//! - response parsing and token usage
//! - status code to error mapping
//! - exactly one request per call


use market_digest::llm::provider::{CompletionRequest, FinishReason, LlmError, LlmProvider};
use market_digest::llm::providers::openai::{OpenAiConfig, OpenAiProvider};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> OpenAiConfig {
    OpenAiConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
        label: "groq".to_string(),
    }
}

fn test_request() -> CompletionRequest {
    CompletionRequest::with_system(
        "llama-3.3-70b-versatile",
        "You are a financial analyst.",
        "Summarize these points under 200 words:\nDow up",
    )
    .temperature(Some(0.7))
    .max_tokens(Some(4096))
}

#[tokio::test]
async fn test_provider_returns_completion_for_valid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-api-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama-3.3-70b-versatile",
            "max_tokens": 4096,
            "messages": [
                {"role": "system", "content": "You are a financial analyst."},
                {"role": "user", "content": "Summarize these points under 200 words:\nDow up"}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(test_helpers::completion_body("Stocks rose.")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let response = provider.complete(test_request()).await.unwrap();

    assert_eq!(response.content.as_deref(), Some("Stocks rose."));
    assert_eq!(response.model, "llama-3.3-70b-versatile");
    assert_eq!(response.usage.total_tokens, 30);
    assert!(matches!(response.finish_reason, FinishReason::Stop));
}

#[tokio::test]
async fn test_provider_maps_auth_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let err = provider.complete(test_request()).await.unwrap_err();

    assert!(matches!(err, LlmError::AuthenticationFailed(_)));
}

#[tokio::test]
async fn test_provider_maps_rate_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let err = provider.complete(test_request()).await.unwrap_err();

    assert!(matches!(err, LlmError::RateLimitExceeded(ref msg) if msg.contains("slow down")));
}

#[tokio::test]
async fn test_provider_does_not_retry_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let err = provider.complete(test_request()).await.unwrap_err();

    assert!(matches!(err, LlmError::ApiError(ref msg) if msg.contains("server error")));
}

#[tokio::test]
async fn test_provider_rejects_response_without_choices() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
        )
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let err = provider.complete(test_request()).await.unwrap_err();

    assert!(matches!(err, LlmError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_provider_reports_network_error() {
    // Nothing listens on this port
    let provider = OpenAiProvider::new(test_config("http://127.0.0.1:9")).unwrap();
    let err = provider.complete(test_request()).await.unwrap_err();

    assert!(matches!(err, LlmError::NetworkError(_)));
}

#[test]
fn test_provider_requires_api_key() {
    let mut config = test_config("http://localhost");
    config.api_key.clear();

    assert!(matches!(
        OpenAiProvider::new(config),
        Err(LlmError::NotConfigured(_))
    ));
}
