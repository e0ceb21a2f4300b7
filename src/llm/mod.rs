//! LLM provider abstraction layer
//!
//! This module provides the chat-completion and embedding interface the
//! navigator, the agents and the retrieval indexes are written against.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
