//! Mock implementations for testing
//!
//! Provides a scripted LlmProvider and a recording Tool so the navigator,
//! indexes and agents can be exercised without network access.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
    ToolCall,
};
use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Dimension of mock embeddings
pub const MOCK_EMBEDDING_DIM: usize = 512;

/// Bag-of-words embedding: each lowercase word hashed into a bucket
///
/// Texts sharing words get similar vectors, which is enough to test ranking.
pub fn hash_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; MOCK_EMBEDDING_DIM];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        // FNV-1a
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.to_lowercase().bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        vector[(hash % MOCK_EMBEDDING_DIM as u64) as usize] += 1.0;
    }
    vector
}

/// One scripted model reply
#[derive(Debug, Clone)]
pub enum MockTurn {
    Text(String),
    ToolCalls(Vec<(String, Value)>),
    Fail(LlmError),
}

impl MockTurn {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Call a function with empty arguments
    pub fn call(name: impl Into<String>) -> Self {
        Self::ToolCalls(vec![(name.into(), json!({}))])
    }

    pub fn call_with(name: impl Into<String>, arguments: Value) -> Self {
        Self::ToolCalls(vec![(name.into(), arguments)])
    }

    pub fn calls(calls: Vec<(&str, Value)>) -> Self {
        Self::ToolCalls(
            calls
                .into_iter()
                .map(|(name, args)| (name.to_string(), args))
                .collect(),
        )
    }

    pub fn fail(error: LlmError) -> Self {
        Self::Fail(error)
    }
}

/// Mock LLM provider for testing
///
/// Completions replay the script in order and fail once it runs out.
/// Embeddings use `hash_embedding` and never consume the script.
#[derive(Debug)]
pub struct MockLlmProvider {
    turns: Mutex<VecDeque<MockTurn>>,
    requests: Mutex<Vec<CompletionRequest>>,
    embed_calls: Mutex<Vec<Vec<String>>>,
    call_counter: AtomicUsize,
    should_fail: bool,
}

impl MockLlmProvider {
    /// Provider that answers with the given texts in order
    pub fn new(responses: Vec<String>) -> Self {
        Self::scripted(responses.into_iter().map(MockTurn::Text).collect())
    }

    pub fn scripted(turns: Vec<MockTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
            embed_calls: Mutex::new(Vec::new()),
            call_counter: AtomicUsize::new(0),
            should_fail: false,
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Self::scripted(vec![])
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Every completion request received so far
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    /// Inputs of every embeddings call so far
    pub async fn embed_calls(&self) -> Vec<Vec<String>> {
        self.embed_calls.lock().await.clone()
    }

    pub async fn remaining_turns(&self) -> usize {
        self.turns.lock().await.len()
    }

    fn response(content: Option<String>, tool_calls: Option<Vec<ToolCall>>) -> CompletionResponse {
        let finish_reason = if tool_calls.is_some() {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        };
        CompletionResponse {
            content,
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason,
            tool_calls,
            metadata: HashMap::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().await.push(request);

        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock LLM failure".to_string()));
        }

        let turn = self.turns.lock().await.pop_front().ok_or_else(|| {
            LlmError::InvalidResponse("Mock script exhausted".to_string())
        })?;

        match turn {
            MockTurn::Text(content) => Ok(Self::response(Some(content), None)),
            MockTurn::ToolCalls(calls) => {
                let tool_calls = calls
                    .into_iter()
                    .map(|(name, arguments)| ToolCall {
                        id: format!("call_{}", self.call_counter.fetch_add(1, Ordering::SeqCst)),
                        name,
                        arguments,
                    })
                    .collect();
                Ok(Self::response(None, Some(tool_calls)))
            }
            MockTurn::Fail(error) => Err(error),
        }
    }

    async fn embed(&self, _model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.embed_calls.lock().await.push(inputs.to_vec());

        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock embedding failure".to_string()));
        }

        Ok(inputs.iter().map(|text| hash_embedding(text)).collect())
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.should_fail {
            Err(LlmError::RequestFailed(
                "Mock health check failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Tool that records its calls and returns a fixed result
#[derive(Debug, Clone)]
pub struct MockTool {
    name: String,
    description: String,
    result: Value,
    should_fail: bool,
    pub executed: Arc<Mutex<Vec<Value>>>,
}

impl MockTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, result: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            result,
            should_fail: false,
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_failure(name: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            ..Self::new(name, "Always fails", Value::Null)
        }
    }

    pub async fn executed(&self) -> Vec<Value> {
        self.executed.lock().await.clone()
    }
}

#[async_trait]
impl Tool for MockTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: json!({
                "type": "object",
                "properties": {"input": {"type": "string"}},
                "required": ["input"]
            }),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        self.executed.lock().await.push(parameters.clone());
        if self.should_fail {
            return Err(ToolError::ExecutionError(format!(
                "Mock tool failure: {}",
                self.name
            )));
        }
        Ok(self.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedding_is_deterministic_and_case_insensitive() {
        assert_eq!(hash_embedding("Boston Harbor"), hash_embedding("boston harbor"));
        assert_eq!(hash_embedding("").iter().sum::<f32>(), 0.0);
    }

    #[tokio::test]
    async fn test_script_replays_in_order_then_fails() {
        let llm = MockLlmProvider::scripted(vec![MockTurn::call("history"), MockTurn::text("done")]);

        let first = llm
            .complete(CompletionRequest::new("m", vec![]))
            .await
            .unwrap();
        assert_eq!(first.requested_tool_calls().unwrap()[0].name, "history");
        assert_eq!(first.finish_reason, FinishReason::ToolCalls);

        let second = llm
            .complete(CompletionRequest::new("m", vec![]))
            .await
            .unwrap();
        assert_eq!(second.text(), Some("done"));

        assert!(llm.complete(CompletionRequest::new("m", vec![])).await.is_err());
        assert_eq!(llm.requests().await.len(), 3);
    }
}
