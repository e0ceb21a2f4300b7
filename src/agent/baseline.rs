//! Baseline: one vector index over every document

use crate::config::AppConfig;
use crate::corpus::Corpus;
use crate::error::QaResult;
use crate::index::{
    node_parser, QueryEngine, QueryResponse, Synthesizer, TextChunker, VectorIndex,
    VectorQueryEngine,
};
use crate::llm::LlmProvider;
use std::sync::Arc;
use tracing::info;

/// Plain retrieval over the whole corpus, for comparison with the agents
pub struct BaselineEngine {
    engine: VectorQueryEngine,
}

impl BaselineEngine {
    pub async fn build(
        corpus: &Corpus,
        llm: Arc<dyn LlmProvider>,
        config: &AppConfig,
    ) -> QaResult<Self> {
        let chunker = TextChunker::new(
            config.retrieval.chunk_size,
            config.retrieval.chunk_overlap,
        )?;
        let nodes = node_parser(corpus.documents(), &chunker);
        info!(documents = corpus.len(), nodes = nodes.len(), "Building baseline index");

        let index =
            VectorIndex::build(llm.clone(), config.llm.embedding_model.clone(), nodes).await?;
        let synthesizer = Synthesizer::from_app_config(llm, config);

        Ok(Self {
            engine: VectorQueryEngine::new(index, synthesizer, config.retrieval.baseline_top_k),
        })
    }

    pub async fn query(&self, question: &str) -> QaResult<QueryResponse> {
        Ok(self.engine.query(question).await?)
    }
}
