//! Named-entity extraction for routing questions to documents
//!
//! The model pulls places and topics out of a question; the gazetteer maps
//! places back onto corpus titles and doubles as a no-LLM fallback.

use crate::config::AppConfig;
use crate::error::{QaError, QaResult};
use crate::llm::{CompletionRequest, LlmProvider, Message, ResponseFormat};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

const EXTRACTION_PROMPT: &str = "Extract the named entities from the user's question. \
Return only a JSON object of the form {\"places\": [...], \"topics\": [...]} where places \
are cities, regions or countries and topics are the subjects being asked about. \
Use empty lists when nothing matches.";

/// Entities found in a question
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    #[serde(default)]
    pub places: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// LLM-backed entity extractor
pub struct EntityExtractor {
    llm: Arc<dyn LlmProvider>,
    model: String,
    temperature: Option<f32>,
}

impl EntityExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>, temperature: Option<f32>) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature,
        }
    }

    pub fn from_app_config(llm: Arc<dyn LlmProvider>, config: &AppConfig) -> Self {
        Self::new(llm, config.llm.model.clone(), config.llm.temperature)
    }

    /// Ask the model for the places and topics in `question`
    pub async fn extract(&self, question: &str) -> QaResult<ExtractedEntities> {
        let request = CompletionRequest::new(
            self.model.clone(),
            vec![Message::system(EXTRACTION_PROMPT), Message::user(question)],
        )
        .with_sampling(self.temperature, None)
        .with_response_format(ResponseFormat::Json);

        let response = self.llm.complete(request).await?;
        let raw = response
            .text()
            .ok_or_else(|| QaError::entity_extraction("model returned no content"))?;

        let entities = parse_entities(raw)?;
        debug!(places = ?entities.places, topics = ?entities.topics, "Extracted entities");
        Ok(entities)
    }

    /// Corpus titles a question is about
    ///
    /// Extracted places are mapped through the gazetteer; when extraction
    /// fails or finds nothing the gazetteer scans the question directly.
    pub async fn resolve_documents(
        &self,
        question: &str,
        gazetteer: &Gazetteer,
    ) -> QaResult<Vec<String>> {
        let mut titles: Vec<String> = Vec::new();

        match self.extract(question).await {
            Ok(entities) => {
                for place in &entities.places {
                    if let Some(title) = gazetteer.match_place(place) {
                        if !titles.iter().any(|t| t == title) {
                            titles.push(title.to_string());
                        }
                    }
                }
            }
            Err(QaError::EntityExtraction { message }) => {
                warn!(error = %message, "Entity extraction failed, falling back to title scan");
            }
            Err(e) => return Err(e),
        }

        if titles.is_empty() {
            titles = gazetteer.resolve(question);
        }
        Ok(titles)
    }
}

/// Parse the model's reply, tolerating markdown code fences
pub fn parse_entities(raw: &str) -> QaResult<ExtractedEntities> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(cleaned)
        .map_err(|e| QaError::entity_extraction(format!("{e}; raw response: {raw}")))
}

/// Drop a surrounding ```` ``` ```` fence and its language tag, if any
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.split_once('\n') {
        Some((_tag, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Whole-word, case-insensitive title matcher over the corpus
#[derive(Debug, Clone)]
pub struct Gazetteer {
    entries: Vec<(String, Regex)>,
}

impl Gazetteer {
    pub fn new(titles: &[String]) -> Self {
        let entries = titles
            .iter()
            .filter_map(|title| {
                let pattern = format!(
                    "{}{}{}",
                    word_boundary(title.chars().next()),
                    regex::escape(title),
                    word_boundary(title.chars().last())
                );
                match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                    Ok(re) => Some((title.clone(), re)),
                    Err(e) => {
                        warn!(title = %title, error = %e, "Skipping title in gazetteer");
                        None
                    }
                }
            })
            .collect();
        Self { entries }
    }

    /// Titles mentioned in `text`, in corpus order
    pub fn resolve(&self, text: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(title, _)| title.clone())
            .collect()
    }

    /// Corpus title for an extracted place name
    ///
    /// Exact matches win; otherwise the first title mentioned inside the
    /// place ("Toronto, Canada") is used.
    pub fn match_place(&self, place: &str) -> Option<&str> {
        let place = place.trim();
        self.entries
            .iter()
            .find(|(title, _)| title.eq_ignore_ascii_case(place))
            .or_else(|| self.entries.iter().find(|(_, re)| re.is_match(place)))
            .map(|(title, _)| title.as_str())
    }

    pub fn titles(&self) -> Vec<&str> {
        self.entries.iter().map(|(t, _)| t.as_str()).collect()
    }
}

/// `\b` only makes sense next to a word character
fn word_boundary(edge: Option<char>) -> &'static str {
    match edge {
        Some(c) if c.is_alphanumeric() || c == '_' => r"\b",
        _ => "",
    }
}
