//! LLM tool loop shared by the document and top-level agents
//!
//! Ask the model, run any tools it calls, feed the results back and ask
//! again until it answers in plain text or the iteration limit is hit.

use crate::config::AppConfig;
use crate::error::{QaError, QaResult};
use crate::llm::{CompletionRequest, CompletionResponse, LlmProvider, Message, ToolCall};
use crate::tool_span;
use crate::tools::{ToolDescription, ToolSystem};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// One tool call made while answering
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
    pub output: String,
}

/// Final answer of an agent
#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    pub answer: String,
    pub tool_calls: Vec<ToolInvocation>,
    pub iterations: usize,
}

/// Model settings plus the iteration bound
#[derive(Clone)]
pub struct ToolLoop {
    llm: Arc<dyn LlmProvider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    max_iterations: usize,
}

impl ToolLoop {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>, max_iterations: usize) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            max_iterations,
        }
    }

    pub fn from_app_config(llm: Arc<dyn LlmProvider>, config: &AppConfig) -> Self {
        Self {
            llm,
            model: config.llm.function_model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            max_iterations: config.agent.max_iterations,
        }
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Answer `question` with the given tools available
    pub async fn run(
        &self,
        agent: &str,
        system_prompt: &str,
        question: &str,
        tools: &ToolSystem,
    ) -> QaResult<AgentResponse> {
        let available_tools = tools.describe_all();
        let mut messages = Self::build_initial_messages(system_prompt, question);
        let mut invocations = Vec::new();
        let mut iteration = 0;

        loop {
            iteration += 1;
            Self::check_iteration_limit(iteration, self.max_iterations)?;

            let request = self.create_completion_request(messages.clone(), &available_tools);
            let response = self.llm.complete(request).await?;

            if let Some(tool_calls) = response.requested_tool_calls() {
                debug!(
                    agent = %agent,
                    iteration,
                    tool_count = tool_calls.len(),
                    "Processing tool calls"
                );

                Self::add_assistant_response(&mut messages, &response);
                for call in tool_calls {
                    let output = Self::execute_tool_call(tools, call).await;
                    messages.push(Message::tool_result(call.id.clone(), output.clone()));
                    invocations.push(ToolInvocation {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                        output,
                    });
                }
                continue;
            }

            let answer = response
                .text()
                .ok_or_else(|| QaError::EmptyAnswer {
                    agent: agent.to_string(),
                })?
                .to_string();

            info!(
                agent = %agent,
                iterations = iteration,
                tool_calls = invocations.len(),
                "Agent answered"
            );
            return Ok(AgentResponse {
                answer,
                tool_calls: invocations,
                iterations: iteration,
            });
        }
    }

    /// Run one tool; failures go back to the model as text
    async fn execute_tool_call(tools: &ToolSystem, call: &ToolCall) -> String {
        let span = tool_span!(tool = %call.name, call_id = %call.id);
        async {
            debug!(arguments = %call.arguments, "Executing tool");
            match tools.execute_tool(&call.name, &call.arguments).await {
                Ok(Value::String(text)) => text,
                Ok(value) => value.to_string(),
                Err(e) => {
                    warn!(error = %e, "Tool call failed");
                    format!("Error: {e}")
                }
            }
        }
        .instrument(span)
        .await
    }

    /// System prompt with the current date, then the question (pure function)
    fn build_initial_messages(system_prompt: &str, question: &str) -> Vec<Message> {
        let now = chrono::Utc::now();
        let system = format!(
            "{system_prompt}\n\nCurrent date: {}",
            now.format("%Y-%m-%d")
        );
        vec![Message::system(system), Message::user(question)]
    }

    /// Returns Err if the limit is exceeded (pure validation)
    fn check_iteration_limit(iteration: usize, max_iterations: usize) -> QaResult<()> {
        if iteration > max_iterations {
            return Err(QaError::IterationLimit {
                max: max_iterations,
            });
        }
        Ok(())
    }

    fn add_assistant_response(messages: &mut Vec<Message>, response: &CompletionResponse) {
        let calls = response.requested_tool_calls().unwrap_or_default().to_vec();
        messages.push(Message::assistant_tool_calls(
            response.text().map(str::to_string),
            calls,
        ));
    }

    fn create_completion_request(
        &self,
        messages: Vec<Message>,
        available_tools: &[ToolDescription],
    ) -> CompletionRequest {
        CompletionRequest::new(self.model.clone(), messages)
            .with_tools(available_tools.to_vec())
            .with_sampling(self.temperature, self.max_tokens)
    }
}
