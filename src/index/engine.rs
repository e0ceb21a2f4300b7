//! Query engines: retrieval plus answer synthesis

use super::{IndexError, ScoredNode, SummaryIndex, VectorIndex};
use crate::config::AppConfig;
use crate::llm::{CompletionRequest, LlmProvider, Message};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Answer plus the nodes it was drawn from
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub source_nodes: Vec<ScoredNode>,
}

/// Anything that can answer a free-text query
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn query(&self, query: &str) -> Result<QueryResponse, IndexError>;
}

/// Turns retrieved context into an answer with one completion call
#[derive(Clone)]
pub struct Synthesizer {
    llm: Arc<dyn LlmProvider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl Synthesizer {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature,
            max_tokens,
        }
    }

    pub fn from_app_config(llm: Arc<dyn LlmProvider>, config: &AppConfig) -> Self {
        Self::new(
            llm,
            config.llm.model.clone(),
            config.llm.temperature,
            config.llm.max_tokens,
        )
    }

    /// Answer `query` from the given context passages
    pub async fn answer(&self, query: &str, contexts: &[&str]) -> Result<String, IndexError> {
        let prompt = format!(
            "Context information is below.\n---------------------\n{}\n---------------------\n\
             Given the context information and not prior knowledge, answer the query.\n\
             Query: {query}\nAnswer:",
            contexts.join("\n\n")
        );
        self.complete(prompt).await
    }

    /// Merge partial answers into one
    pub async fn combine(&self, query: &str, partials: &[String]) -> Result<String, IndexError> {
        let numbered: Vec<String> = partials
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}. {}", i + 1, p))
            .collect();
        let prompt = format!(
            "Partial answers drawn from different parts of a document are below.\n\
             ---------------------\n{}\n---------------------\n\
             Combine them into a single coherent answer to the query.\n\
             Query: {query}\nAnswer:",
            numbered.join("\n")
        );
        self.complete(prompt).await
    }

    async fn complete(&self, prompt: String) -> Result<String, IndexError> {
        let request = CompletionRequest::new(self.model.clone(), vec![Message::user(prompt)])
            .with_sampling(self.temperature, self.max_tokens);
        let response = self.llm.complete(request).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(IndexError::EmptyAnswer)
    }
}

/// Answers from the top-k most similar nodes
pub struct VectorQueryEngine {
    index: VectorIndex,
    synthesizer: Synthesizer,
    top_k: usize,
}

impl VectorQueryEngine {
    pub fn new(index: VectorIndex, synthesizer: Synthesizer, top_k: usize) -> Self {
        Self {
            index,
            synthesizer,
            top_k,
        }
    }
}

#[async_trait]
impl QueryEngine for VectorQueryEngine {
    async fn query(&self, query: &str) -> Result<QueryResponse, IndexError> {
        let source_nodes = self.index.retrieve(query, self.top_k).await?;
        let contexts: Vec<&str> = source_nodes.iter().map(|s| s.node.text.as_str()).collect();
        let answer = self.synthesizer.answer(query, &contexts).await?;
        Ok(QueryResponse {
            answer,
            source_nodes,
        })
    }
}

/// Answers from every node of a document
pub struct SummaryQueryEngine {
    index: SummaryIndex,
}

impl SummaryQueryEngine {
    pub fn new(index: SummaryIndex) -> Self {
        Self { index }
    }
}

#[async_trait]
impl QueryEngine for SummaryQueryEngine {
    async fn query(&self, query: &str) -> Result<QueryResponse, IndexError> {
        let answer = self.index.summarize(query).await?;
        let source_nodes = self
            .index
            .nodes()
            .iter()
            .map(|node| ScoredNode {
                node: node.clone(),
                score: None,
            })
            .collect();
        Ok(QueryResponse {
            answer,
            source_nodes,
        })
    }
}
