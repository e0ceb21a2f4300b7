//! Query engine exposed as a tool

use super::{Tool, ToolDescription, ToolError};
use crate::index::QueryEngine;
use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Parameters every query engine tool takes
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// Free-text query to run against the engine
    pub input: String,
}

/// Wraps a `QueryEngine`; the tool result is the engine's answer text
pub struct QueryEngineTool {
    name: String,
    description: String,
    engine: Arc<dyn QueryEngine>,
}

impl QueryEngineTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        engine: Arc<dyn QueryEngine>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            engine,
        }
    }

    /// JSON Schema of `QueryInput`
    pub fn parameters_schema() -> Value {
        serde_json::to_value(schema_for!(QueryInput)).unwrap_or_else(|_| {
            serde_json::json!({
                "type": "object",
                "properties": {"input": {"type": "string"}},
                "required": ["input"]
            })
        })
    }
}

#[async_trait]
impl Tool for QueryEngineTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: Self::parameters_schema(),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let input: QueryInput = serde_json::from_value(parameters.clone())
            .map_err(|e| ToolError::ValidationError(e.to_string()))?;

        let response = self
            .engine
            .query(&input.input)
            .await
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;

        debug!(
            tool = %self.name,
            sources = ?response.source_nodes.iter().map(|s| s.node.id.as_str()).collect::<Vec<_>>(),
            "Query engine tool answered"
        );
        Ok(Value::String(response.answer))
    }
}
