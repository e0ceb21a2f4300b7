//! Error types for cityqa
//!
//! Each layer owns a focused error enum; `QaError` is the umbrella the CLI
//! and the question-answering entry points return.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("static regex")
});

static BEARER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)bearer\s+\S+").expect("static regex"));

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("static regex")
});

const MAX_MESSAGE_LEN: usize = 500;

/// Main error type for question answering
#[derive(Debug, Error)]
pub enum QaError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("LLM provider error: {0}")]
    Llm(#[from] crate::llm::LlmError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] crate::corpus::CorpusError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] crate::navigator::NavigationError),

    #[error("Tool error: {0}")]
    Tool(#[from] crate::tools::ToolError),

    #[error("Index error: {0}")]
    Index(#[from] crate::index::IndexError),

    #[error("Entity extraction failed: {message}")]
    EntityExtraction { message: String },

    #[error("Agent '{agent}' returned an empty answer")]
    EmptyAnswer { agent: String },

    #[error("Agent exceeded maximum iterations ({max})")]
    IterationLimit { max: usize },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl QaError {
    /// Create entity extraction error
    pub fn entity_extraction<S: Into<String>>(message: S) -> Self {
        Self::EntityExtraction {
            message: message.into(),
        }
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Message safe to print to a terminal or log aggregator
    pub fn user_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Redact secrets and sensitive paths and cap the message length
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN
        .replace_all(message, "${1}=***")
        .to_string();

    sanitized = BEARER_PATTERN
        .replace_all(&sanitized, "Bearer ***")
        .to_string();

    sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    if sanitized.len() > MAX_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}

/// Result type for question answering operations
pub type QaResult<T> = Result<T, QaError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::navigator::NavigationError;

    #[test]
    fn test_error_conversion_from_llm_error() {
        let error: QaError = LlmError::RateLimitExceeded("slow down".to_string()).into();
        assert!(matches!(error, QaError::Llm(_)));
        assert_eq!(
            error.to_string(),
            "LLM provider error: Rate limit exceeded: slow down"
        );
    }

    #[test]
    fn test_error_conversion_from_navigation_error() {
        let error: QaError = NavigationError::UnknownFunction {
            name: "nightlife".to_string(),
            available: vec!["history".to_string()],
        }
        .into();
        assert!(matches!(error, QaError::Navigation(_)));
        assert!(error.to_string().contains("nightlife"));
    }

    #[test]
    fn test_constructors() {
        let error = QaError::entity_extraction("bad json");
        assert_eq!(error.to_string(), "Entity extraction failed: bad json");

        let error = QaError::invalid_input("empty question");
        assert_eq!(error.to_string(), "Invalid input: empty question");

        let error = QaError::IterationLimit { max: 10 };
        assert!(error.to_string().contains("10"));
    }

    #[test]
    fn test_error_message_sanitization() {
        let error = QaError::invalid_input("Failed to authenticate: password=secret123 token=abc456");
        let message = error.user_message();

        assert!(!message.contains("secret123"));
        assert!(!message.contains("abc456"));
        assert!(message.contains("password=***"));
        assert!(message.contains("token=***"));
    }

    #[test]
    fn test_bearer_token_redaction() {
        let sanitized = sanitize_error_message("header was Bearer sk-abcdef123");
        assert!(!sanitized.contains("sk-abcdef123"));
        assert!(sanitized.contains("Bearer ***"));
    }

    #[test]
    fn test_long_message_truncation() {
        let sanitized = sanitize_error_message(&"x".repeat(600));
        assert!(sanitized.len() <= 500);
        assert!(sanitized.ends_with("...[truncated]"));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let sanitized = sanitize_error_message(&"é".repeat(400));
        assert!(sanitized.len() <= 500);
        assert!(sanitized.ends_with("...[truncated]"));
    }

    #[test]
    fn test_file_path_redaction() {
        let sanitized =
            sanitize_error_message("Failed to read /home/user/.ssh/id_rsa and /etc/secrets/api.key");
        assert!(sanitized.contains("/***REDACTED***/"));
        assert!(!sanitized.contains("/home/user/.ssh/id_rsa"));
    }

    #[test]
    fn test_sanitize_exactly_500_chars() {
        let sanitized = sanitize_error_message(&"x".repeat(500));
        assert_eq!(sanitized.len(), 500);
        assert!(!sanitized.contains("truncated"));
    }

    #[test]
    fn test_sanitize_empty_message() {
        assert_eq!(sanitize_error_message(""), "");
    }
}
