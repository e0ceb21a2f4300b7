//! Per-document agent with a vector tool and a summary tool

use super::tool_loop::{AgentResponse, ToolLoop};
use crate::config::AppConfig;
use crate::corpus::Document;
use crate::error::QaResult;
use crate::index::{
    node_parser, QueryEngine, SummaryIndex, SummaryQueryEngine, Synthesizer, TextChunker,
    VectorIndex, VectorQueryEngine,
};
use crate::llm::LlmProvider;
use crate::tools::{QueryEngineTool, QueryInput, Tool, ToolDescription, ToolError, ToolSystem};
use crate::topics::prefixed_function_name;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub const VECTOR_TOOL: &str = "vector_tool";
pub const SUMMARY_TOOL: &str = "summary_tool";
/// Prefix of the tool wrapping a document agent
pub const AGENT_TOOL_PREFIX: &str = "tool_";

/// Answers questions about a single document
pub struct DocumentAgent {
    title: String,
    tools: ToolSystem,
    tool_loop: ToolLoop,
}

impl DocumentAgent {
    /// Chunk, embed and index `document`
    pub async fn build(
        document: &Document,
        llm: Arc<dyn LlmProvider>,
        config: &AppConfig,
    ) -> QaResult<Self> {
        let chunker = TextChunker::new(
            config.retrieval.chunk_size,
            config.retrieval.chunk_overlap,
        )?;
        let nodes = node_parser(std::slice::from_ref(document), &chunker);
        let synthesizer = Synthesizer::from_app_config(llm.clone(), config);

        let vector_index =
            VectorIndex::build(llm.clone(), config.llm.embedding_model.clone(), nodes.clone())
                .await?;
        let vector_engine = VectorQueryEngine::new(
            vector_index,
            synthesizer.clone(),
            config.retrieval.top_k,
        );
        let summary_engine = SummaryQueryEngine::new(SummaryIndex::new(
            nodes,
            synthesizer,
            config.retrieval.summary_batch_chars,
        ));

        info!(document = %document.title, "Built document agent");
        Self::from_engines(
            &document.title,
            Arc::new(vector_engine),
            Arc::new(summary_engine),
            ToolLoop::from_app_config(llm, config),
        )
    }

    /// Agent over prebuilt engines
    pub fn from_engines(
        title: &str,
        vector_engine: Arc<dyn QueryEngine>,
        summary_engine: Arc<dyn QueryEngine>,
        tool_loop: ToolLoop,
    ) -> QaResult<Self> {
        let mut tools = ToolSystem::new();
        tools.register(Arc::new(QueryEngineTool::new(
            VECTOR_TOOL,
            format!(
                "Useful for questions related to specific aspects of {title} \
                 (e.g. the history, arts and culture, sports, demographics, or more)."
            ),
            vector_engine,
        )))?;
        tools.register(Arc::new(QueryEngineTool::new(
            SUMMARY_TOOL,
            format!(
                "Useful for any requests that require a holistic summary of EVERYTHING \
                 about {title}. For questions about more specific sections, please use \
                 the {VECTOR_TOOL}."
            ),
            summary_engine,
        )))?;

        Ok(Self {
            title: title.to_string(),
            tools,
            tool_loop,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn tools(&self) -> &ToolSystem {
        &self.tools
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are a specialized agent designed to answer queries about {}. \
             You must ALWAYS use at least one of the tools provided when answering a \
             question; do NOT rely on prior knowledge.",
            self.title
        )
    }

    pub async fn chat(&self, question: &str) -> QaResult<AgentResponse> {
        self.tool_loop
            .run(&self.title, &self.system_prompt(), question, &self.tools)
            .await
    }
}

/// A document agent exposed to the top agent as `tool_<title>`
pub struct DocumentAgentTool {
    name: String,
    agent: Arc<DocumentAgent>,
}

impl DocumentAgentTool {
    pub fn new(agent: Arc<DocumentAgent>) -> Self {
        let name = Self::tool_name(agent.title());
        Self::with_name(agent, name)
    }

    /// Tool under an explicit name, e.g. one made unique by a `NameAllocator`
    pub fn with_name(agent: Arc<DocumentAgent>, name: String) -> Self {
        Self { name, agent }
    }

    pub fn tool_name(title: &str) -> String {
        prefixed_function_name(AGENT_TOOL_PREFIX, title)
    }
}

#[async_trait]
impl Tool for DocumentAgentTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.name.clone(),
            description: format!(
                "Use this tool if you want to answer any questions about {}.",
                self.agent.title()
            ),
            parameters: QueryEngineTool::parameters_schema(),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let input: QueryInput = serde_json::from_value(parameters.clone())
            .map_err(|e| ToolError::ValidationError(e.to_string()))?;
        let response = self
            .agent
            .chat(&input.input)
            .await
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;
        Ok(Value::String(response.answer))
    }
}
