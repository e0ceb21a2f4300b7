//! Embedding index with cosine-similarity retrieval

use super::{IndexError, Node, ScoredNode};
use crate::llm::LlmProvider;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Inputs per embeddings request
const EMBED_BATCH_SIZE: usize = 100;

/// Cosine similarity of two vectors; 0.0 for mismatched or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Embed `inputs` in batches, checking one vector comes back per input
pub async fn embed_all(
    llm: &dyn LlmProvider,
    model: &str,
    inputs: &[String],
) -> Result<Vec<Vec<f32>>, IndexError> {
    let mut embeddings = Vec::with_capacity(inputs.len());
    for batch in inputs.chunks(EMBED_BATCH_SIZE) {
        let vectors = llm.embed(model, batch).await?;
        if vectors.len() != batch.len() {
            return Err(IndexError::EmbeddingCountMismatch {
                expected: batch.len(),
                got: vectors.len(),
            });
        }
        embeddings.extend(vectors);
    }
    Ok(embeddings)
}

/// Nodes and their embeddings, held in memory
pub struct VectorIndex {
    llm: Arc<dyn LlmProvider>,
    embedding_model: String,
    entries: Vec<(Node, Vec<f32>)>,
}

impl VectorIndex {
    /// Embed every node
    pub async fn build(
        llm: Arc<dyn LlmProvider>,
        embedding_model: impl Into<String>,
        nodes: Vec<Node>,
    ) -> Result<Self, IndexError> {
        if nodes.is_empty() {
            return Err(IndexError::Empty);
        }
        let embedding_model = embedding_model.into();

        let texts: Vec<String> = nodes.iter().map(|n| n.text.clone()).collect();
        let embeddings = embed_all(llm.as_ref(), &embedding_model, &texts).await?;
        info!(nodes = nodes.len(), model = %embedding_model, "Built vector index");

        Ok(Self {
            llm,
            embedding_model,
            entries: nodes.into_iter().zip(embeddings).collect(),
        })
    }

    /// The `top_k` nodes most similar to `query`, best first
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredNode>, IndexError> {
        let query_embedding = embed_all(
            self.llm.as_ref(),
            &self.embedding_model,
            &[query.to_string()],
        )
        .await?
        .pop()
        .ok_or(IndexError::EmbeddingCountMismatch {
            expected: 1,
            got: 0,
        })?;

        let mut scored: Vec<(f32, &Node)> = self
            .entries
            .iter()
            .map(|(node, embedding)| (cosine_similarity(&query_embedding, embedding), node))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        debug!(
            query = %query,
            hits = ?scored.iter().map(|(s, n)| (n.id.as_str(), *s)).collect::<Vec<_>>(),
            "Retrieved nodes"
        );

        Ok(scored
            .into_iter()
            .map(|(score, node)| ScoredNode {
                node: node.clone(),
                score: Some(score),
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
