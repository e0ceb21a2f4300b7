//! Tool system for the document and top-level agents
//!
//! A tool describes itself with a JSON Schema for its parameters; the
//! `ToolSystem` validates every call against that schema before executing.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod query_engine_tool;

pub use query_engine_tool::{QueryEngineTool, QueryInput};

/// Callable tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and JSON Schema for the parameters
    fn describe(&self) -> ToolDescription;

    /// Run with parameters already validated against `describe().parameters`
    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError>;
}

/// What the model sees of a tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Registry of tools, listed in registration order
#[derive(Default)]
pub struct ToolSystem {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool; names must be unique
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.describe().name;
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get tool description
    pub fn describe_tool(&self, tool_name: &str) -> Option<ToolDescription> {
        self.tools.get(tool_name).map(|tool| tool.describe())
    }

    /// Descriptions of every tool, in registration order
    pub fn describe_all(&self) -> Vec<ToolDescription> {
        self.order
            .iter()
            .filter_map(|name| self.describe_tool(name))
            .collect()
    }

    /// Execute tool with validated parameters
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: &Value,
    ) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;

        Self::validate_parameters(&tool.describe(), parameters)?;

        tool.execute(parameters).await
    }

    fn validate_parameters(description: &ToolDescription, parameters: &Value) -> Result<(), ToolError> {
        let validator = jsonschema::validator_for(&description.parameters)
            .map_err(|e| ToolError::SchemaError(format!("Schema compilation error: {e}")))?;

        validator.validate(parameters).map_err(|errors| {
            let error_messages: Vec<String> = errors
                .map(|e| format!("At '{}': {}", e.instance_path, e))
                .collect();
            ToolError::ValidationError(error_messages.join("; "))
        })
    }

    /// Get list of available tools
    pub fn list_tools(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Tool system errors
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),
    #[error("Parameter validation failed: {0}")]
    ValidationError(String),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}
