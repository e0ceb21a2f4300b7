//! Top-level agent routing questions to document agents

use super::document_agent::{DocumentAgent, DocumentAgentTool, AGENT_TOOL_PREFIX};
use super::tool_loop::{AgentResponse, ToolLoop};
use crate::config::AppConfig;
use crate::error::QaResult;
use crate::index::cosine_similarity;
use crate::index::vector::embed_all;
use crate::llm::LlmProvider;
use crate::tools::{Tool, ToolSystem};
use crate::topics::NameAllocator;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

const TOP_AGENT_PROMPT: &str = "You are an agent designed to answer queries about a set of \
given cities. Please always use the tools provided to answer a question. Do not rely on \
prior knowledge.";

/// Agent over document agents, offering only the tools most relevant to
/// each question
pub struct TopAgent {
    tools: Vec<(Arc<dyn Tool>, Vec<f32>)>,
    embedding_model: String,
    tool_top_k: usize,
    tool_loop: ToolLoop,
}

impl TopAgent {
    /// Wrap each document agent as a tool and embed the tool descriptions
    ///
    /// Titles that slug to the same name get `_2`, `_3`, ... suffixes.
    pub async fn build(
        agents: Vec<Arc<DocumentAgent>>,
        llm: Arc<dyn LlmProvider>,
        config: &AppConfig,
    ) -> QaResult<Self> {
        let tool_loop = ToolLoop::from_app_config(llm, config);
        let mut names = NameAllocator::new();
        Self::with_tools(
            agents
                .into_iter()
                .map(|agent| {
                    let name = names.allocate_prefixed(AGENT_TOOL_PREFIX, agent.title());
                    Arc::new(DocumentAgentTool::with_name(agent, name)) as Arc<dyn Tool>
                })
                .collect(),
            config.llm.embedding_model.clone(),
            config.agent.tool_top_k,
            tool_loop,
        )
        .await
    }

    /// Agent over arbitrary tools
    pub async fn with_tools(
        tools: Vec<Arc<dyn Tool>>,
        embedding_model: String,
        tool_top_k: usize,
        tool_loop: ToolLoop,
    ) -> QaResult<Self> {
        let descriptions: Vec<String> = tools
            .iter()
            .map(|tool| tool.describe().description)
            .collect();
        let embeddings = if descriptions.is_empty() {
            Vec::new()
        } else {
            embed_all(tool_loop.llm().as_ref(), &embedding_model, &descriptions).await?
        };
        info!(tools = tools.len(), "Built top agent");

        Ok(Self {
            tools: tools.into_iter().zip(embeddings).collect(),
            embedding_model,
            tool_top_k,
            tool_loop,
        })
    }

    /// The `tool_top_k` tools whose descriptions best match `question`
    pub async fn retrieve_tools(&self, question: &str) -> QaResult<Vec<Arc<dyn Tool>>> {
        if self.tools.is_empty() {
            return Ok(Vec::new());
        }

        let query = embed_all(
            self.tool_loop.llm().as_ref(),
            &self.embedding_model,
            &[question.to_string()],
        )
        .await?;
        let query = query.first().map(Vec::as_slice).unwrap_or_default();

        let mut scored: Vec<(f32, &Arc<dyn Tool>)> = self
            .tools
            .iter()
            .map(|(tool, embedding)| (cosine_similarity(query, embedding), tool))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(self.tool_top_k);

        debug!(
            tools = ?scored.iter().map(|(s, t)| (t.describe().name, *s)).collect::<Vec<_>>(),
            "Retrieved tools"
        );
        Ok(scored.into_iter().map(|(_, tool)| tool.clone()).collect())
    }

    pub async fn chat(&self, question: &str) -> QaResult<AgentResponse> {
        let mut tools = ToolSystem::new();
        for tool in self.retrieve_tools(question).await? {
            tools.register(tool)?;
        }
        self.tool_loop
            .run("top_agent", TOP_AGENT_PROMPT, question, &tools)
            .await
    }

    /// Tool names in build order
    pub fn tool_names(&self) -> Vec<String> {
        self.tools
            .iter()
            .map(|(tool, _)| tool.describe().name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
