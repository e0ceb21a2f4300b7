//! OpenAI provider implementation
//!
//! Chat completions with function calling, plus the embeddings endpoint.
//! Any server speaking the same protocol works through `base_url`.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
    MessageRole, ResponseFormat, TokenUsage, ToolCall as ProviderToolCall,
};
use crate::tools::ToolDescription;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// OpenAI provider configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl OpenAiConfig {
    /// Build provider configuration from the application config
    pub fn from_app_config(
        config: &crate::config::AppConfig,
    ) -> Result<Self, crate::config::ConfigError> {
        Ok(Self {
            api_key: config.get_llm_api_key()?,
            base_url: config.llm.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.llm.timeout_secs),
        })
    }
}

/// OpenAI provider implementation
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::NotConfigured(
                "OpenAI API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Estimate token count for messages (pure function)
    fn estimate_token_count(messages: &[OpenAiMessage]) -> usize {
        messages
            .iter()
            .map(|m| m.content.as_ref().map(|c| c.len()).unwrap_or(0) / 4)
            .sum()
    }

    /// Convert completion request to OpenAI format (pure function)
    fn convert_to_openai_request(
        request: &CompletionRequest,
        messages: Vec<OpenAiMessage>,
        tools: Option<Vec<OpenAiTool>>,
    ) -> OpenAiCompletionRequest {
        let response_format = request.response_format.as_ref().map(|rf| match rf {
            ResponseFormat::Text => OpenAiResponseFormat::Simple {
                format_type: "text".to_string(),
            },
            ResponseFormat::Json => OpenAiResponseFormat::Simple {
                format_type: "json_object".to_string(),
            },
            ResponseFormat::JsonSchema { json_schema } => OpenAiResponseFormat::JsonSchema {
                format_type: "json_schema".to_string(),
                json_schema: OpenAiJsonSchema {
                    name: json_schema.name.clone(),
                    strict: json_schema.strict,
                    schema: json_schema.schema.clone(),
                },
            },
        });

        OpenAiCompletionRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            stop: request.stop_sequences.clone(),
            tools,
            tool_choice: request.tool_choice.clone(),
            response_format,
        }
    }

    /// Parse OpenAI completion response (pure function)
    fn parse_completion_response(
        openai_response: OpenAiCompletionResponse,
        request_metadata: HashMap<String, String>,
    ) -> Result<CompletionResponse, LlmError> {
        let choice = openai_response.choices.into_iter().next().ok_or_else(|| {
            LlmError::InvalidResponse("No choices returned from OpenAI".to_string())
        })?;

        let usage = openai_response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        let tool_calls = choice
            .message
            .tool_calls
            .as_ref()
            .map(|calls| Self::extract_tool_calls(calls))
            .transpose()?;

        Ok(CompletionResponse {
            content: choice.message.content,
            model: openai_response.model,
            usage,
            finish_reason: Self::convert_finish_reason(choice.finish_reason.as_deref()),
            tool_calls,
            metadata: request_metadata,
        })
    }

    /// Extract tool calls from OpenAI format (pure function)
    ///
    /// Blank argument strings are read as an empty object; anything else that
    /// is not JSON fails the whole response.
    fn extract_tool_calls(calls: &[OpenAiToolCall]) -> Result<Vec<ProviderToolCall>, LlmError> {
        calls
            .iter()
            .map(|call| {
                let raw = call.function.arguments.trim();
                let arguments = if raw.is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(raw).map_err(|e| {
                        error!("Failed to parse tool call arguments: {}", e);
                        LlmError::InvalidResponse(format!(
                            "Tool call '{}' has malformed arguments: {e}",
                            call.function.name
                        ))
                    })?
                };
                Ok(ProviderToolCall {
                    id: call.id.clone(),
                    name: call.function.name.clone(),
                    arguments,
                })
            })
            .collect()
    }

    /// Convert OpenAI finish reason to internal format (pure function)
    fn convert_finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("tool_calls") | Some("function_call") => FinishReason::ToolCalls,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Error,
        }
    }

    /// Convert internal message to OpenAI format (pure function)
    fn convert_message(message: &Message) -> OpenAiMessage {
        let role = match message.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        };

        let tool_calls = message.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|call| OpenAiToolCall {
                    id: call.id.clone(),
                    call_type: "function".to_string(),
                    function: OpenAiFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect::<Vec<_>>()
        });

        // Assistant turns that only carry tool calls send a null content
        let content = if tool_calls.is_some() && message.content.is_empty() {
            None
        } else {
            Some(message.content.clone())
        };

        OpenAiMessage {
            role: role.to_string(),
            content,
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
        }
    }

    /// Convert tool description to OpenAI tool format (pure function)
    fn convert_tool(tool_desc: &ToolDescription) -> OpenAiTool {
        OpenAiTool {
            tool_type: "function".to_string(),
            function: OpenAiFunction {
                name: tool_desc.name.clone(),
                description: tool_desc.description.clone(),
                parameters: tool_desc.parameters.clone(),
            },
        }
    }

    /// Order embeddings by their index field (pure function)
    fn parse_embedding_response(
        response: OpenAiEmbeddingResponse,
        expected: usize,
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut data = response.data;
        data.sort_by_key(|d| d.index);

        if data.len() != expected {
            return Err(LlmError::InvalidResponse(format!(
                "Expected {expected} embeddings, got {}",
                data.len()
            )));
        }

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let openai_messages: Vec<OpenAiMessage> =
            request.messages.iter().map(Self::convert_message).collect();

        let tools = request
            .tools
            .as_ref()
            .map(|descriptions| descriptions.iter().map(Self::convert_tool).collect());

        let estimated_tokens = Self::estimate_token_count(&openai_messages);
        self.log_request_info(&openai_messages, estimated_tokens);

        let openai_request = Self::convert_to_openai_request(&request, openai_messages, tools);

        let body = &openai_request;
        let openai_response: OpenAiCompletionResponse = self
            .with_retry("chat completion", move || self.post_json("chat/completions", body))
            .await?;

        let response = Self::parse_completion_response(openai_response, request.metadata)?;
        self.log_response_info(&response);
        Ok(response)
    }

    async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let request = OpenAiEmbeddingRequest {
            model: model.to_string(),
            input: inputs.to_vec(),
        };

        debug!("OpenAI embedding request: {} inputs", inputs.len());
        let body = &request;
        let response: OpenAiEmbeddingResponse = self
            .with_retry("embedding", move || self.post_json("embeddings", body))
            .await?;

        Self::parse_embedding_response(response, inputs.len())
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let response = self
            .client
            .get(format!("{}/models", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LlmError::AuthenticationFailed(
                "OpenAI API authentication failed".to_string(),
            ))
        }
    }
}

impl OpenAiProvider {
    /// Log request information (impure)
    fn log_request_info(&self, messages: &[OpenAiMessage], estimated_tokens: usize) {
        debug!(
            "OpenAI request: {} messages, estimated ~{} tokens",
            messages.len(),
            estimated_tokens
        );

        if estimated_tokens > 120000 {
            warn!(
                "Large request detected: estimated {} tokens, may exceed model limits",
                estimated_tokens
            );
        }
    }

    /// Retry orchestrator - handles only retry and backoff (impure)
    async fn with_retry<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let backoff_delays = [100u64, 200, 300];
        let mut last_error = None;

        for (attempt, &delay_ms) in std::iter::once(&0u64)
            .chain(backoff_delays.iter())
            .enumerate()
        {
            if attempt > 0 {
                debug!(
                    "OpenAI {} retry attempt {} after {}ms delay",
                    label, attempt, delay_ms
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("OpenAI {} succeeded after {} retries", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    warn!("OpenAI {} attempt {} failed: {}", label, attempt + 1, e);
                    if !Self::should_retry(&e) {
                        error!("Non-retryable OpenAI error, aborting: {}", e);
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        error!("OpenAI {} failed after all retries", label);
        Err(last_error
            .unwrap_or_else(|| LlmError::NetworkError("All retry attempts failed".to_string())))
    }

    /// Make single API request (impure I/O)
    async fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R, LlmError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{}", self.config.base_url, endpoint))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                let error_msg = format!(
                    "HTTP request failed: {} (is_connect: {}, is_timeout: {})",
                    e,
                    e.is_connect(),
                    e.is_timeout()
                );
                warn!("OpenAI network error details: {}", error_msg);
                LlmError::NetworkError(error_msg)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    /// Map a non-success status to an error (pure)
    fn classify_status(status: StatusCode, error_text: &str) -> LlmError {
        if status.is_server_error() {
            return LlmError::ApiError(format!(
                "OpenAI API server error: {status} - {error_text}"
            ));
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                LlmError::AuthenticationFailed(format!("{status} - {error_text}"))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                LlmError::RateLimitExceeded(format!("{status} - {error_text}"))
            }
            _ => {
                if error_text.contains("maximum context length")
                    || error_text.contains("too many tokens")
                {
                    warn!("Token limit exceeded - the section text may be too long");
                }
                LlmError::ApiError(format!("OpenAI API error: {status} - {error_text}"))
            }
        }
    }

    /// Check if error should trigger retry (pure)
    fn should_retry(error: &LlmError) -> bool {
        match error {
            LlmError::NetworkError(_) | LlmError::RateLimitExceeded(_) => true,
            LlmError::ApiError(msg) => msg.contains("server error"),
            _ => false,
        }
    }

    /// Log response information (impure)
    fn log_response_info(&self, response: &CompletionResponse) {
        debug!(
            "OpenAI response: {} tokens used (prompt: {}, completion: {}), finish_reason: {:?}, tool_calls: {}",
            response.usage.total_tokens,
            response.usage.prompt_tokens,
            response.usage.completion_tokens,
            response.finish_reason,
            response.tool_calls.as_ref().map(|tc| tc.len()).unwrap_or(0)
        );
    }
}

#[derive(Debug, Serialize)]
struct OpenAiCompletionRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAiResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiCompletionResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type", default = "default_call_type")]
    call_type: String,
    function: OpenAiFunctionCall,
}

fn default_call_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI response format
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum OpenAiResponseFormat {
    /// Simple type string
    Simple {
        #[serde(rename = "type")]
        format_type: String,
    },
    /// JSON schema with strict validation
    JsonSchema {
        #[serde(rename = "type")]
        format_type: String,
        json_schema: OpenAiJsonSchema,
    },
}

/// OpenAI JSON Schema format
#[derive(Debug, Serialize, Deserialize)]
struct OpenAiJsonSchema {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    strict: Option<bool>,
    schema: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_provider() -> OpenAiProvider {
        OpenAiProvider::new(OpenAiConfig {
            api_key: "test-key".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_openai_config_default() {
        let config = OpenAiConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_openai_provider_creation_without_api_key() {
        let result = OpenAiProvider::new(OpenAiConfig::default());
        assert!(matches!(result, Err(LlmError::NotConfigured(_))));
    }

    #[test]
    fn test_openai_provider_name() {
        assert_eq!(test_provider().name(), "openai");
    }

    #[test]
    fn test_message_conversion() {
        let openai_message = OpenAiProvider::convert_message(&Message::user("Hello"));
        assert_eq!(openai_message.role, "user");
        assert_eq!(openai_message.content, Some("Hello".to_string()));
        assert!(openai_message.tool_calls.is_none());
    }

    #[test]
    fn test_tool_call_message_round_trips_arguments_as_string() {
        let message = Message::assistant_tool_calls(
            None,
            vec![ProviderToolCall {
                id: "call_9".to_string(),
                name: "history".to_string(),
                arguments: json!({"depth": 1}),
            }],
        );

        let openai_message = OpenAiProvider::convert_message(&message);
        assert_eq!(openai_message.content, None);
        let calls = openai_message.tool_calls.unwrap();
        assert_eq!(calls[0].function.arguments, "{\"depth\":1}");
        assert_eq!(calls[0].call_type, "function");
    }

    #[test]
    fn test_tool_result_message_carries_call_id() {
        let openai_message =
            OpenAiProvider::convert_message(&Message::tool_result("call_9", "text"));
        assert_eq!(openai_message.role, "tool");
        assert_eq!(openai_message.tool_call_id.as_deref(), Some("call_9"));
    }

    #[test]
    fn test_blank_arguments_become_empty_object() {
        let calls = vec![OpenAiToolCall {
            id: "call_1".to_string(),
            call_type: "function".to_string(),
            function: OpenAiFunctionCall {
                name: "history".to_string(),
                arguments: "".to_string(),
            },
        }];
        let parsed = OpenAiProvider::extract_tool_calls(&calls).unwrap();
        assert_eq!(parsed[0].arguments, json!({}));
    }

    #[test]
    fn test_malformed_arguments_are_rejected() {
        let calls = vec![OpenAiToolCall {
            id: "call_1".to_string(),
            call_type: "function".to_string(),
            function: OpenAiFunctionCall {
                name: "history".to_string(),
                arguments: "{not json".to_string(),
            },
        }];
        assert!(matches!(
            OpenAiProvider::extract_tool_calls(&calls),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_finish_reason_conversion() {
        assert_eq!(
            OpenAiProvider::convert_finish_reason(Some("stop")),
            FinishReason::Stop
        );
        assert_eq!(
            OpenAiProvider::convert_finish_reason(Some("tool_calls")),
            FinishReason::ToolCalls
        );
        assert_eq!(
            OpenAiProvider::convert_finish_reason(Some("length")),
            FinishReason::Length
        );
        assert_eq!(
            OpenAiProvider::convert_finish_reason(None),
            FinishReason::Error
        );
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            OpenAiProvider::classify_status(StatusCode::UNAUTHORIZED, "bad key"),
            LlmError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            OpenAiProvider::classify_status(StatusCode::TOO_MANY_REQUESTS, "slow"),
            LlmError::RateLimitExceeded(_)
        ));
        let server = OpenAiProvider::classify_status(StatusCode::BAD_GATEWAY, "oops");
        assert!(OpenAiProvider::should_retry(&server));
        let client = OpenAiProvider::classify_status(StatusCode::BAD_REQUEST, "oops");
        assert!(!OpenAiProvider::should_retry(&client));
    }

    #[test]
    fn test_embedding_response_is_ordered_by_index() {
        let response = OpenAiEmbeddingResponse {
            data: vec![
                OpenAiEmbedding {
                    index: 1,
                    embedding: vec![0.0, 1.0],
                },
                OpenAiEmbedding {
                    index: 0,
                    embedding: vec![1.0, 0.0],
                },
            ],
        };
        let vectors = OpenAiProvider::parse_embedding_response(response, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_embedding_count_mismatch() {
        let response = OpenAiEmbeddingResponse { data: vec![] };
        assert!(OpenAiProvider::parse_embedding_response(response, 1).is_err());
    }

    #[test]
    fn test_openai_request_serialization() {
        let request = CompletionRequest::new("gpt-4", vec![Message::user("Hello")])
            .with_sampling(Some(0.7), Some(100));
        let messages = request.messages.iter().map(OpenAiProvider::convert_message).collect();
        let openai_request = OpenAiProvider::convert_to_openai_request(&request, messages, None);

        let json = serde_json::to_string(&openai_request).unwrap();
        assert!(json.contains("\"model\":\"gpt-4\""));
        assert!(json.contains("\"max_tokens\":100"));
        assert!(json.contains("\"temperature\":0.7"));
        assert!(!json.contains("top_p"));
        assert!(!json.contains("tool_choice"));
    }
}
