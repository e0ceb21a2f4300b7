//! Document corpus
//!
//! Articles are fetched once and cached as `<data_dir>/<title>.txt`; every
//! later command loads them from disk.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub mod wikipedia;

pub use wikipedia::{WikipediaClient, WikipediaConfig};

/// One article of the corpus
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub text: String,
}

impl Document {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Corpus errors
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Failed to fetch '{title}': {message}")]
    Fetch { title: String, message: String },
    #[error("Wikipedia has no article titled '{0}'")]
    PageNotFound(String),
    #[error("'{title}' is not cached at {path}; run `cityqa fetch` first")]
    NotCached { title: String, path: PathBuf },
    #[error("Unknown document: {0}")]
    UnknownDocument(String),
    #[error("Corpus I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a fetch run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FetchReport {
    pub downloaded: Vec<String>,
    pub cached: Vec<String>,
}

/// Documents in configuration order
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Cache file for a title
    pub fn cache_path(data_dir: &Path, title: &str) -> PathBuf {
        data_dir.join(format!("{title}.txt"))
    }

    /// Download every title not cached yet (or all of them with `refresh`)
    pub async fn fetch(
        titles: &[String],
        data_dir: &Path,
        client: &WikipediaClient,
        refresh: bool,
    ) -> Result<FetchReport, CorpusError> {
        tokio::fs::create_dir_all(data_dir).await?;

        let mut report = FetchReport::default();
        for title in titles {
            let path = Self::cache_path(data_dir, title);
            if !refresh && tokio::fs::try_exists(&path).await? {
                report.cached.push(title.clone());
                continue;
            }

            let document = client.fetch(title).await?;
            tokio::fs::write(&path, &document.text).await?;
            info!(title = %title, path = %path.display(), "Cached article");
            report.downloaded.push(title.clone());
        }

        Ok(report)
    }

    /// Load cached articles; every title must have been fetched
    pub fn load(titles: &[String], data_dir: &Path) -> Result<Self, CorpusError> {
        let documents = titles
            .iter()
            .map(|title| Self::load_one(title, data_dir))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { documents })
    }

    /// Load the cached article of a configured title, matched case-insensitively
    ///
    /// Only configured titles are looked up, so arbitrary input never turns
    /// into a path outside `data_dir`.
    pub fn load_configured(
        titles: &[String],
        title: &str,
        data_dir: &Path,
    ) -> Result<Document, CorpusError> {
        let configured = titles
            .iter()
            .find(|t| t.eq_ignore_ascii_case(title.trim()))
            .ok_or_else(|| CorpusError::UnknownDocument(title.to_string()))?;
        Self::load_one(configured, data_dir)
    }

    /// Load a single cached article
    pub fn load_one(title: &str, data_dir: &Path) -> Result<Document, CorpusError> {
        let path = Self::cache_path(data_dir, title);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Document::new(title, text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CorpusError::NotCached {
                title: title.to_string(),
                path,
            }),
            Err(e) => Err(CorpusError::Io(e)),
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn titles(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.title.clone()).collect()
    }

    /// Case-insensitive lookup by title
    pub fn get(&self, title: &str) -> Result<&Document, CorpusError> {
        self.documents
            .iter()
            .find(|d| d.title.eq_ignore_ascii_case(title))
            .ok_or_else(|| CorpusError::UnknownDocument(title.to_string()))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
