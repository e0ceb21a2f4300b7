//! Topic navigator: function-call resolution over a topic tree
//!
//! At each section the model sees the question, the section's own text and
//! one function per subsection. Calling a function descends into that
//! subsection; answering in plain text ends the walk. Leaves (and sections
//! at the depth limit) are answered from their full text with no functions
//! offered.
//!
//! ```rust
//! # tokio_test::block_on(async {
//! use cityqa::navigator::{NavigatorConfig, TopicNavigator};
//! use cityqa::testing::{MockLlmProvider, MockTurn};
//! use cityqa::topics::TopicTree;
//! use std::sync::Arc;
//!
//! let tree = TopicTree::build("Boston", "Boston is a city.\n== Culture ==\nMuseums.\n");
//! let llm = Arc::new(MockLlmProvider::scripted(vec![
//!     MockTurn::call("culture"),
//!     MockTurn::text("Museums."),
//! ]));
//!
//! let navigator = TopicNavigator::new(llm, NavigatorConfig::default());
//! let answer = navigator.answer("What is there to see?", &tree).await.unwrap();
//! assert_eq!(answer.breadcrumb(), "Boston > Culture");
//! # });
//! ```

use crate::config::AppConfig;
use crate::llm::{CompletionRequest, LlmError, LlmProvider, Message};
use crate::navigation_span;
use crate::tools::ToolDescription;
use crate::topics::{TopicNode, TopicTree};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};

/// Navigation errors
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("Model called unknown function '{name}' (available: {})", .available.join(", "))]
    UnknownFunction { name: String, available: Vec<String> },
    #[error("Model returned an empty answer for section '{section}'")]
    EmptyAnswer { section: String },
    #[error("Question must not be empty")]
    EmptyQuestion,
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Settings for one navigator
#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Maximum number of descents before answering from the current section
    pub max_depth: usize,
    pub system_prompt: String,
}

impl NavigatorConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            model: config.llm.function_model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            max_depth: config.navigator.max_depth,
            system_prompt: config.navigator.system_prompt.clone(),
        }
    }
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

/// How the walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model answered from a section that still had subsections
    AnsweredInline,
    /// A leaf section was reached
    Leaf,
    /// The depth limit was reached
    DepthLimit,
}

/// Answer plus the sections visited to reach it
#[derive(Debug, Clone, Serialize)]
pub struct NavigationAnswer {
    pub document: String,
    pub answer: String,
    /// Titles of the sections descended into, root excluded
    pub path: Vec<String>,
    /// Function names called, parallel to `path`
    pub function_path: Vec<String>,
    pub stop_reason: StopReason,
}

impl NavigationAnswer {
    /// "Boston > Culture > Arts"
    pub fn breadcrumb(&self) -> String {
        std::iter::once(self.document.as_str())
            .chain(self.path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

/// What the model decided at one section
#[derive(Debug)]
enum StepDecision<'a> {
    Descend(&'a TopicNode),
    Answer(String),
}

/// Walks a topic tree with the model choosing the branch
pub struct TopicNavigator {
    llm: Arc<dyn LlmProvider>,
    config: NavigatorConfig,
}

impl TopicNavigator {
    pub fn new(llm: Arc<dyn LlmProvider>, config: NavigatorConfig) -> Self {
        Self { llm, config }
    }

    /// Answer `question` from `tree`
    pub async fn answer(
        &self,
        question: &str,
        tree: &TopicTree,
    ) -> Result<NavigationAnswer, NavigationError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(NavigationError::EmptyQuestion);
        }

        let document = tree.title().to_string();
        let mut node = tree.root();
        let mut path = Vec::new();
        let mut function_path = Vec::new();

        loop {
            let depth = path.len();
            let span = navigation_span!(document = %document, section = %node.title, depth);

            if node.is_leaf() || depth >= self.config.max_depth {
                let stop_reason = if node.is_leaf() {
                    StopReason::Leaf
                } else {
                    warn!(
                        document = %document,
                        section = %node.title,
                        max_depth = self.config.max_depth,
                        "Depth limit reached, answering from current section"
                    );
                    StopReason::DepthLimit
                };

                let answer = self
                    .answer_from_section(question, &document, node)
                    .instrument(span)
                    .await?;
                info!(document = %document, sections = depth, "Answered from section text");
                return Ok(NavigationAnswer {
                    document,
                    answer,
                    path,
                    function_path,
                    stop_reason,
                });
            }

            match self
                .choose_step(question, &document, &path, node)
                .instrument(span)
                .await?
            {
                StepDecision::Descend(child) => {
                    debug!(
                        document = %document,
                        from = %node.title,
                        to = %child.title,
                        "Descending into subsection"
                    );
                    path.push(child.title.clone());
                    function_path.push(child.function_name.clone());
                    node = child;
                }
                StepDecision::Answer(answer) => {
                    info!(document = %document, sections = depth, "Model answered inline");
                    return Ok(NavigationAnswer {
                        document,
                        answer,
                        path,
                        function_path,
                        stop_reason: StopReason::AnsweredInline,
                    });
                }
            }
        }
    }

    /// Ask the model to pick a subsection or answer (one step)
    async fn choose_step<'a>(
        &self,
        question: &str,
        document: &str,
        path: &[String],
        node: &'a TopicNode,
    ) -> Result<StepDecision<'a>, NavigationError> {
        let messages = vec![
            Message::system(self.config.system_prompt.clone()),
            Message::user(Self::section_prompt(question, document, path, node)),
        ];
        let request = self
            .base_request(messages)
            .with_tools(Self::child_functions(document, node));

        let response = self.llm.complete(request).await?;

        if let Some(calls) = response.requested_tool_calls() {
            if calls.len() > 1 {
                warn!(
                    count = calls.len(),
                    "Model requested several sections, following the first"
                );
            }
            let call = &calls[0];
            return Self::resolve_call(node, &call.name).map(StepDecision::Descend);
        }

        match response.text() {
            Some(text) => Ok(StepDecision::Answer(text.to_string())),
            None => Err(NavigationError::EmptyAnswer {
                section: node.title.clone(),
            }),
        }
    }

    /// Final answer grounded in a section's full text
    async fn answer_from_section(
        &self,
        question: &str,
        document: &str,
        node: &TopicNode,
    ) -> Result<String, NavigationError> {
        let passage = node.full_text();
        let messages = vec![
            Message::system(
                "Answer the question using only the passage below. If the passage \
                 does not contain the answer, say so.",
            ),
            Message::user(format!(
                "Passage from the section '{}' of the article '{}':\n\n{}\n\nQuestion: {}",
                node.title,
                document,
                if passage.is_empty() { "(empty)" } else { &passage },
                question
            )),
        ];

        let response = self.llm.complete(self.base_request(messages)).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or_else(|| NavigationError::EmptyAnswer {
                section: node.title.clone(),
            })
    }

    /// Map a called function name onto a child (pure function)
    fn resolve_call<'a>(node: &'a TopicNode, name: &str) -> Result<&'a TopicNode, NavigationError> {
        node.find_child(name)
            .ok_or_else(|| NavigationError::UnknownFunction {
                name: name.to_string(),
                available: node.child_function_names(),
            })
    }

    /// One function per child section (pure function)
    fn child_functions(document: &str, node: &TopicNode) -> Vec<ToolDescription> {
        node.children
            .iter()
            .map(|child| {
                let mut description =
                    format!("Read the section '{}' of the article on {}.", child.title, document);
                if !child.is_leaf() {
                    let subsections: Vec<&str> =
                        child.children.iter().map(|c| c.title.as_str()).collect();
                    description.push_str(&format!(" Subsections: {}.", subsections.join(", ")));
                }
                ToolDescription {
                    name: child.function_name.clone(),
                    description,
                    parameters: json!({"type": "object", "properties": {}}),
                }
            })
            .collect()
    }

    /// User prompt for a step (pure function)
    fn section_prompt(question: &str, document: &str, path: &[String], node: &TopicNode) -> String {
        let location = if path.is_empty() {
            format!("the introduction of the article '{document}'")
        } else {
            format!("the section '{}' of the article '{document}'", path.join(" > "))
        };
        let text = if node.text.is_empty() {
            "(this section has no text of its own)"
        } else {
            node.text.as_str()
        };

        format!("Question: {question}\n\nYou are reading {location}.\n\n{text}")
    }

    fn base_request(&self, messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest::new(self.config.model.clone(), messages)
            .with_sampling(self.config.temperature, self.config.max_tokens)
    }
}
