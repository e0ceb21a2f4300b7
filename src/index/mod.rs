//! In-memory retrieval over chunked documents
//!
//! Documents are split into word-window nodes, then served either by a
//! vector index (top-k by cosine similarity) or a summary index (every node,
//! summarized in batches). Both sit behind the `QueryEngine` trait.

use crate::corpus::Document;
use crate::llm::LlmError;
use serde::Serialize;
use thiserror::Error;

pub mod chunker;
pub mod engine;
pub mod summary;
pub mod vector;

pub use chunker::TextChunker;
pub use engine::{QueryEngine, QueryResponse, Synthesizer, SummaryQueryEngine, VectorQueryEngine};
pub use summary::SummaryIndex;
pub use vector::{cosine_similarity, VectorIndex};

/// Index errors
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Invalid chunking: {0}")]
    InvalidChunking(String),
    #[error("Index has no nodes")]
    Empty,
    #[error("Embedding count mismatch: expected {expected}, got {got}")]
    EmbeddingCountMismatch { expected: usize, got: usize },
    #[error("Model returned an empty answer")]
    EmptyAnswer,
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// One chunk of a document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub doc_title: String,
    pub text: String,
}

/// A node with its retrieval score, if it was ranked
#[derive(Debug, Clone, Serialize)]
pub struct ScoredNode {
    pub node: Node,
    pub score: Option<f32>,
}

/// Split documents into nodes with ids `<title>#<n>`
pub fn node_parser(documents: &[Document], chunker: &TextChunker) -> Vec<Node> {
    documents
        .iter()
        .flat_map(|doc| {
            chunker
                .chunk(&doc.text)
                .into_iter()
                .enumerate()
                .map(move |(n, text)| Node {
                    id: format!("{}#{}", doc.title, n),
                    doc_title: doc.title.clone(),
                    text,
                })
        })
        .collect()
}
