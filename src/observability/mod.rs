//! Observability for cityqa
//!
//! Structured logging through `tracing`, configured from the environment.

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};

// Span macros for structured logging
pub use logging::{navigation_span, question_span, tool_span};
