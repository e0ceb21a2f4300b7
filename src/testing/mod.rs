//! Testing utilities and mock implementations
//!
//! Mocks for the LLM provider and tools, usable from unit and integration
//! tests without network access.

pub mod mocks;

pub use mocks::*;
