//! Summary index: every node of a document, summarized in batches

use super::{IndexError, Node, Synthesizer};
use tracing::debug;

pub struct SummaryIndex {
    nodes: Vec<Node>,
    synthesizer: Synthesizer,
    batch_chars: usize,
}

impl SummaryIndex {
    pub fn new(nodes: Vec<Node>, synthesizer: Synthesizer, batch_chars: usize) -> Self {
        Self {
            nodes,
            synthesizer,
            batch_chars,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Answer `query` over all nodes
    ///
    /// Node texts are packed into batches under the character budget; each
    /// batch yields a partial answer and the partials are combined once.
    pub async fn summarize(&self, query: &str) -> Result<String, IndexError> {
        if self.nodes.is_empty() {
            return Err(IndexError::Empty);
        }

        let batches = self.batches();
        let mut partials = Vec::with_capacity(batches.len());
        for batch in &batches {
            partials.push(self.synthesizer.answer(query, batch).await?);
        }
        debug!(batches = batches.len(), "Summarized node batches");

        if partials.len() == 1 {
            return Ok(partials.remove(0));
        }
        self.synthesizer.combine(query, &partials).await
    }

    /// Group node texts so each group stays under `batch_chars`
    ///
    /// A node longer than the budget gets a batch of its own.
    fn batches(&self) -> Vec<Vec<&str>> {
        let mut batches: Vec<Vec<&str>> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0;

        for node in &self.nodes {
            let len = node.text.len();
            if !current.is_empty() && current_len + len > self.batch_chars {
                batches.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(node.text.as_str());
            current_len += len;
        }
        if !current.is_empty() {
            batches.push(current);
        }

        batches
    }
}
