//! Integration tests for the OpenAI provider
//!
//! Tests behavioral contracts against a mock HTTP server:
//! - chat completions with and without function calls
//! - request shape for tools and tool results
//! - embeddings ordering
//! - error classification and retry

mod test_helpers;

use cityqa::llm::provider::{
    CompletionRequest, FinishReason, LlmError, LlmProvider, Message, ToolCall,
};
use cityqa::llm::providers::openai::{OpenAiConfig, OpenAiProvider};
use cityqa::tools::ToolDescription;
use serde_json::json;
use std::time::Duration;
use test_helpers::{chat_text, chat_tool_call};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> OpenAiConfig {
    OpenAiConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
    }
}

fn test_request(model: &str) -> CompletionRequest {
    CompletionRequest::new(model, vec![Message::user("Hello")]).with_sampling(Some(0.0), Some(100))
}

#[tokio::test]
async fn test_openai_provider_returns_successful_completion_with_valid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_text("Boston is in Massachusetts.")))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let response = provider.complete(test_request("gpt-4")).await.unwrap();

    assert_eq!(response.text(), Some("Boston is in Massachusetts."));
    assert_eq!(response.model, "gpt-4");
    assert_eq!(response.usage.total_tokens, 15);
    assert_eq!(response.finish_reason, FinishReason::Stop);
    assert!(response.requested_tool_calls().is_none());
}

#[tokio::test]
async fn test_openai_provider_parses_function_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_tool_call("call_1", "culture", "{}")),
        )
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let response = provider.complete(test_request("gpt-4")).await.unwrap();

    let calls = response.requested_tool_calls().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "call_1");
    assert_eq!(calls[0].name, "culture");
    assert_eq!(calls[0].arguments, json!({}));
    assert_eq!(response.finish_reason, FinishReason::ToolCalls);
    assert_eq!(response.usage.total_tokens, 0);
}

#[tokio::test]
async fn test_openai_provider_sends_tools_and_tool_results_in_protocol_form() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "tool_choice": "auto",
            "tools": [{
                "type": "function",
                "function": {"name": "vector_tool", "description": "Facts"}
            }],
            "messages": [
                {"role": "user", "content": "Hello"},
                {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "vector_tool", "arguments": "{\"input\":\"x\"}"}
                    }]
                },
                {"role": "tool", "content": "result", "tool_call_id": "call_9"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_text("done")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let request = CompletionRequest::new(
        "gpt-4",
        vec![
            Message::user("Hello"),
            Message::assistant_tool_calls(
                None,
                vec![ToolCall {
                    id: "call_9".to_string(),
                    name: "vector_tool".to_string(),
                    arguments: json!({"input": "x"}),
                }],
            ),
            Message::tool_result("call_9", "result"),
        ],
    )
    .with_tools(vec![ToolDescription {
        name: "vector_tool".to_string(),
        description: "Facts".to_string(),
        parameters: json!({"type": "object", "properties": {"input": {"type": "string"}}}),
    }]);

    let response = provider.complete(request).await.unwrap();
    assert_eq!(response.text(), Some("done"));
}

#[tokio::test]
async fn test_openai_provider_rejects_malformed_tool_arguments() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_tool_call("call_1", "history", "{not json")),
        )
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("gpt-4")).await;
    assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_openai_provider_orders_embeddings_by_index() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({"model": "text-embedding-ada-002"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        })))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let inputs = vec!["first".to_string(), "second".to_string()];
    let embeddings = provider
        .embed("text-embedding-ada-002", &inputs)
        .await
        .unwrap();

    assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn test_openai_provider_embedding_count_mismatch_is_invalid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [1.0]}]
        })))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let inputs = vec!["a".to_string(), "b".to_string()];
    let result = provider.embed("text-embedding-ada-002", &inputs).await;
    assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_openai_provider_authentication_failure_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("gpt-4")).await;
    assert!(matches!(result, Err(LlmError::AuthenticationFailed(_))));
}

#[tokio::test]
async fn test_openai_provider_bad_request_is_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_string("maximum context length exceeded"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("gpt-4")).await;
    assert!(matches!(result, Err(LlmError::ApiError(_))));
}

#[tokio::test]
async fn test_openai_provider_retries_server_errors_then_succeeds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_text("recovered")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let response = provider.complete(test_request("gpt-4")).await.unwrap();
    assert_eq!(response.text(), Some("recovered"));
}

#[tokio::test]
async fn test_openai_provider_retries_rate_limit_then_succeeds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_text("after backoff")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let response = provider.complete(test_request("gpt-4")).await.unwrap();
    assert_eq!(response.text(), Some("after backoff"));
}

#[tokio::test]
async fn test_openai_provider_gives_up_after_all_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("gpt-4")).await;
    assert!(matches!(result, Err(LlmError::RateLimitExceeded(_))));
}

#[tokio::test]
async fn test_openai_provider_requires_api_key() {
    let result = OpenAiProvider::new(OpenAiConfig::default());
    assert!(matches!(result, Err(LlmError::NotConfigured(_))));
}
