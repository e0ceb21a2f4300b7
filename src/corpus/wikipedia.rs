//! Wikipedia extract client
//!
//! Fetches the plain-text extract of an article through the MediaWiki
//! `query` API. Section headings survive in the extract as `== Title ==`
//! lines, which is what the topic builder keys on.

use crate::corpus::{CorpusError, Document};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Configuration for the Wikipedia client
#[derive(Debug, Clone)]
pub struct WikipediaConfig {
    /// MediaWiki API endpoint
    pub api_url: String,
    /// HTTP client timeout
    pub timeout: Duration,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client fetching full-article plain-text extracts
#[derive(Debug, Clone)]
pub struct WikipediaClient {
    config: WikipediaConfig,
    client: Client,
}

impl WikipediaClient {
    pub fn new(config: WikipediaConfig) -> Result<Self, CorpusError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("cityqa/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CorpusError::Fetch {
                title: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self { config, client })
    }

    /// Query parameters for a full plain-text extract (pure function)
    fn extract_params(title: &str) -> [(&'static str, &str); 5] {
        [
            ("action", "query"),
            ("format", "json"),
            ("titles", title),
            ("prop", "extracts"),
            ("explaintext", "true"),
        ]
    }

    /// Pull the extract of the first page out of a query response (pure function)
    fn parse_extract(title: &str, json: &Value) -> Result<String, CorpusError> {
        let page = json
            .get("query")
            .and_then(|q| q.get("pages"))
            .and_then(|p| p.as_object())
            .and_then(|pages| pages.values().next())
            .ok_or_else(|| CorpusError::Fetch {
                title: title.to_string(),
                message: "response has no query.pages".to_string(),
            })?;

        if page.get("missing").is_some() {
            return Err(CorpusError::PageNotFound(title.to_string()));
        }

        page.get("extract")
            .and_then(|e| e.as_str())
            .map(str::to_string)
            .ok_or_else(|| CorpusError::PageNotFound(title.to_string()))
    }

    /// Fetch one article
    pub async fn fetch(&self, title: &str) -> Result<Document, CorpusError> {
        debug!(title, "Fetching Wikipedia extract");

        let fetch_error = |message: String| CorpusError::Fetch {
            title: title.to_string(),
            message,
        };

        let response = self
            .client
            .get(&self.config.api_url)
            .query(&Self::extract_params(title))
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {status}")));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let text = Self::parse_extract(title, &json)?;
        debug!(title, chars = text.len(), "Fetched Wikipedia extract");

        Ok(Document::new(title, text))
    }
}
