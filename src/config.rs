//! Configuration system for cityqa
//!
//! Loads a TOML file with one section per concern. Every section has
//! defaults, so an empty file (or no file at all) yields a runnable setup
//! against the public Wikipedia and OpenAI endpoints.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Cities loaded when the configuration does not name any
pub const DEFAULT_TITLES: [&str; 18] = [
    "Toronto",
    "Seattle",
    "Chicago",
    "Boston",
    "Houston",
    "Tokyo",
    "Berlin",
    "Lisbon",
    "Paris",
    "London",
    "Atlanta",
    "Munich",
    "Shanghai",
    "Beijing",
    "Copenhagen",
    "Moscow",
    "Cairo",
    "Karachi",
];

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub corpus: CorpusSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub navigator: NavigatorSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub retrieval: RetrievalSection,
}

/// Corpus section: which articles to fetch and where to cache them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorpusSection {
    /// Wikipedia article titles
    #[serde(default = "default_titles")]
    pub titles: Vec<String>,
    /// Directory holding one `<title>.txt` per article
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// MediaWiki API endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Drop "See also", "References" and similar sections from topic trees
    #[serde(default = "default_true")]
    pub skip_boilerplate: bool,
}

impl Default for CorpusSection {
    fn default() -> Self {
        Self {
            titles: default_titles(),
            data_dir: default_data_dir(),
            api_url: default_api_url(),
            skip_boilerplate: true,
        }
    }
}

fn default_titles() -> Vec<String> {
    DEFAULT_TITLES.iter().map(|t| t.to_string()).collect()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".to_string()
}

fn default_true() -> bool {
    true
}

/// LLM section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name; only "openai" (or a compatible endpoint) is supported
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model answering questions and navigating topics
    #[serde(default = "default_model")]
    pub model: String,
    /// Model driving the function-calling agents
    #[serde(default = "default_function_model")]
    pub function_model: String,
    /// Model used for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,
    /// Optional max tokens per completion
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            function_model: default_function_model(),
            embedding_model: default_embedding_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_function_model() -> String {
    "gpt-4".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> Option<f32> {
    Some(0.0)
}

fn default_timeout_secs() -> u64 {
    60
}

/// Topic navigator section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NavigatorSection {
    /// Deepest level the navigator descends before answering
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_navigator_prompt")]
    pub system_prompt: String,
}

impl Default for NavigatorSection {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            system_prompt: default_navigator_prompt(),
        }
    }
}

fn default_max_depth() -> usize {
    6
}

fn default_navigator_prompt() -> String {
    "You answer questions about a Wikipedia article. The article is split into \
     sections and you only see one section at a time. If the answer is in the \
     text you were given, answer it. Otherwise call the function for the \
     subsection most likely to contain the answer."
        .to_string()
}

/// Multi-document agent section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSection {
    /// Maximum LLM turns per agent query
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Number of document tools the top agent sees per question
    #[serde(default = "default_tool_top_k")]
    pub tool_top_k: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tool_top_k: default_tool_top_k(),
        }
    }
}

fn default_max_iterations() -> usize {
    10
}

fn default_tool_top_k() -> usize {
    3
}

/// Retrieval section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalSection {
    /// Chunk size in words
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Words shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Nodes retrieved by a per-document vector engine
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Nodes retrieved by the baseline engine over the whole corpus
    #[serde(default = "default_baseline_top_k")]
    pub baseline_top_k: usize,
    /// Character budget of one summarization batch
    #[serde(default = "default_summary_batch_chars")]
    pub summary_batch_chars: usize,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            baseline_top_k: default_baseline_top_k(),
            summary_batch_chars: default_summary_batch_chars(),
        }
    }
}

fn default_chunk_size() -> usize {
    200
}

fn default_chunk_overlap() -> usize {
    20
}

fn default_top_k() -> usize {
    2
}

fn default_baseline_top_k() -> usize {
    4
}

fn default_summary_batch_chars() -> usize {
    12_000
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid title: {0}")]
    InvalidTitle(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AppConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.provider != "openai" {
            return Err(ConfigError::InvalidConfig(format!(
                "Unsupported LLM provider: {}",
                self.llm.provider
            )));
        }

        if self.corpus.titles.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "[corpus] titles must not be empty".to_string(),
            ));
        }
        for title in &self.corpus.titles {
            validate_title(title)?;
        }

        for (name, value) in [
            ("corpus.api_url", &self.corpus.api_url),
            ("llm.base_url", &self.llm.base_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                ConfigError::InvalidConfig(format!("{name} is not a valid URL: {e}"))
            })?;
        }

        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidConfig(format!(
                    "llm.temperature must be within 0.0..=2.0, got {temperature}"
                )));
            }
        }

        let retrieval = &self.retrieval;
        if retrieval.chunk_size == 0 || retrieval.chunk_overlap >= retrieval.chunk_size {
            return Err(ConfigError::InvalidConfig(format!(
                "retrieval.chunk_overlap ({}) must be smaller than a non-zero chunk_size ({})",
                retrieval.chunk_overlap, retrieval.chunk_size
            )));
        }

        for (name, value) in [
            ("retrieval.top_k", retrieval.top_k),
            ("retrieval.baseline_top_k", retrieval.baseline_top_k),
            ("retrieval.summary_batch_chars", retrieval.summary_batch_chars),
            ("agent.max_iterations", self.agent.max_iterations),
            ("agent.tool_top_k", self.agent.tool_top_k),
            ("navigator.max_depth", self.navigator.max_depth),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidConfig(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        Ok(())
    }

    /// Get the LLM API key from the configured environment variable
    pub fn get_llm_api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.llm.api_key_env)
            .map_err(|_| ConfigError::EnvVarNotFound(self.llm.api_key_env.clone()))
    }
}

/// Titles become file names, so they must not escape the data directory
fn validate_title(title: &str) -> Result<(), ConfigError> {
    let trimmed = title.trim();
    if trimmed.is_empty()
        || trimmed != title
        || title.contains(['/', '\\'])
        || title == "."
        || title == ".."
    {
        return Err(ConfigError::InvalidTitle(format!(
            "'{title}' cannot be used as a cache file name"
        )));
    }
    Ok(())
}
