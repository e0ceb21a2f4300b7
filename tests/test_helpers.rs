//! Test helpers and utilities for integration tests

use cityqa::config::AppConfig;
use std::path::Path;

/// A small Boston article with nested sections and boilerplate
#[allow(dead_code)]
pub const BOSTON_TEXT: &str = "Boston is the capital of Massachusetts.

== History ==
Boston was founded in 1630 by Puritan settlers.

=== Revolution ===
The Boston Tea Party took place in 1773.

== Culture ==
Boston has a rich cultural life.

=== Music ===
The Boston Symphony Orchestra performs at Symphony Hall.

== See also ==
List of people from Boston
";

/// Configuration pointing at local mock servers and a temporary data dir
#[allow(dead_code)]
pub fn test_config(data_dir: &Path, wiki_url: &str, llm_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.corpus.titles = vec!["Boston".to_string(), "Seattle".to_string()];
    config.corpus.data_dir = data_dir.to_path_buf();
    config.corpus.api_url = wiki_url.to_string();
    config.llm.base_url = llm_url.to_string();
    config.llm.api_key_env = "CITYQA_TEST_API_KEY".to_string();
    config
}

/// OpenAI chat completion body with plain content
#[allow(dead_code)]
pub fn chat_text(content: &str) -> serde_json::Value {
    serde_json::json!({
        "model": "gpt-4",
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

/// OpenAI chat completion body calling one function
#[allow(dead_code)]
pub fn chat_tool_call(id: &str, name: &str, arguments: &str) -> serde_json::Value {
    serde_json::json!({
        "model": "gpt-4",
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": arguments}
                }]
            },
            "finish_reason": "tool_calls"
        }]
    })
}
