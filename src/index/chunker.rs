//! Word-window text chunker

use super::IndexError;

/// Splits text into overlapping windows of whitespace-separated words
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IndexError> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(IndexError::InvalidChunking(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut chunks = Vec::new();
        let step = self.chunk_size - self.chunk_overlap;

        for i in (0..words.len()).step_by(step) {
            let end = (i + self.chunk_size).min(words.len());
            chunks.push(words[i..end].join(" "));
            // The last window already reaches the end of the text
            if end == words.len() {
                break;
            }
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_chunks_overlap() {
        let chunker = TextChunker::new(4, 1).unwrap();
        let chunks = chunker.chunk(&words(10));
        assert_eq!(
            chunks,
            vec!["w0 w1 w2 w3", "w3 w4 w5 w6", "w6 w7 w8 w9"]
        );
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = TextChunker::new(200, 20).unwrap();
        assert_eq!(chunker.chunk("Boston is old."), vec!["Boston is old."]);
    }

    #[test]
    fn test_no_trailing_fragment_chunks() {
        let chunker = TextChunker::new(4, 2).unwrap();
        let chunks = chunker.chunk(&words(6));
        assert_eq!(chunks, vec!["w0 w1 w2 w3", "w2 w3 w4 w5"]);
    }

    #[test]
    fn test_empty_text() {
        let chunker = TextChunker::new(4, 1).unwrap();
        assert!(chunker.chunk("  \n ").is_empty());
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        assert!(TextChunker::new(4, 4).is_err());
        assert!(TextChunker::new(0, 0).is_err());
    }
}
