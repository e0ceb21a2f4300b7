//! Multi-document agents
//!
//! Each document gets an agent with a vector tool and a summary tool; the
//! top agent picks among document agents per question. The baseline engine
//! skips agents entirely.

pub mod baseline;
pub mod document_agent;
pub mod tool_loop;
pub mod top_agent;

pub use baseline::BaselineEngine;
pub use document_agent::{
    DocumentAgent, DocumentAgentTool, AGENT_TOOL_PREFIX, SUMMARY_TOOL, VECTOR_TOOL,
};
pub use tool_loop::{AgentResponse, ToolInvocation, ToolLoop};
pub use top_agent::TopAgent;
