//! cityqa - question answering over Wikipedia city articles
//!
//! Articles are fetched once and cached as plain text. Questions are then
//! answered in one of three ways:
//!
//! - **topics**: the article is split into a tree of sections by its
//!   `== Heading ==` markers, and the model drills down that tree by calling
//!   one function per subsection until it can answer from a single passage.
//! - **agent**: each article gets an agent with a vector tool and a summary
//!   tool; a top-level agent picks among them per question.
//! - **baseline**: plain top-k retrieval over every article.
//!
//! # Quick Start
//!
//! ```rust
//! use cityqa::topics::TopicTree;
//!
//! let text = "Boston is a city.\n== History ==\nFounded in 1630.\n== Culture ==\nMuseums.\n";
//! let tree = TopicTree::build("Boston", text);
//!
//! assert_eq!(tree.root().child_function_names(), vec!["history", "culture"]);
//! assert_eq!(tree.node_count(), 3);
//! ```

pub mod agent;
pub mod config;
pub mod corpus;
pub mod entities;
pub mod error;
pub mod index;
pub mod llm;
pub mod navigator;
pub mod observability;
pub mod session;
pub mod testing;
pub mod tools;
pub mod topics;

pub use config::{AppConfig, ConfigError};
pub use corpus::{Corpus, CorpusError, Document};
pub use error::{QaError, QaResult};
pub use navigator::{NavigationAnswer, NavigationError, TopicNavigator};
pub use session::{Answer, AskMode, QaSession};
pub use topics::{TopicNode, TopicTree};
