//! Question answering over a loaded corpus
//!
//! A session owns the corpus and the provider and builds the heavier
//! engines (document agents, baseline index) on first use, so a chat keeps
//! them across questions.

use crate::agent::{BaselineEngine, DocumentAgent, TopAgent};
use crate::config::AppConfig;
use crate::corpus::Corpus;
use crate::entities::{EntityExtractor, Gazetteer};
use crate::error::{sanitize_error_message, QaError, QaResult};
use crate::llm::LlmProvider;
use crate::navigator::{NavigatorConfig, TopicNavigator};
use crate::question_span;
use crate::topics::{TopicTree, TopicTreeBuilder};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::OnceCell;
use tracing::{info, warn, Instrument};

/// Strategy used to answer a question
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AskMode {
    /// Drill down the topic tree of one document
    #[default]
    Topics,
    /// Top agent over per-document agents
    Agent,
    /// Single vector index over every document
    Baseline,
}

impl fmt::Display for AskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AskMode::Topics => "topics",
            AskMode::Agent => "agent",
            AskMode::Baseline => "baseline",
        };
        f.write_str(name)
    }
}

/// An answer and where it came from
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub mode: AskMode,
    pub answer: String,
    /// Breadcrumb, tools called or node ids, depending on the mode
    pub sources: Vec<String>,
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.answer)?;
        if !self.sources.is_empty() {
            write!(f, "\n[{}] {}", self.mode, self.sources.join(", "))?;
        }
        Ok(())
    }
}

pub struct QaSession {
    config: AppConfig,
    corpus: Corpus,
    llm: Arc<dyn LlmProvider>,
    gazetteer: Gazetteer,
    top_agent: OnceCell<TopAgent>,
    baseline: OnceCell<BaselineEngine>,
}

impl QaSession {
    pub fn new(config: AppConfig, corpus: Corpus, llm: Arc<dyn LlmProvider>) -> Self {
        let gazetteer = Gazetteer::new(&corpus.titles());
        Self {
            config,
            corpus,
            llm,
            gazetteer,
            top_agent: OnceCell::new(),
            baseline: OnceCell::new(),
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Answer one question
    pub async fn ask(&self, question: &str, mode: AskMode, title: Option<&str>) -> QaResult<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QaError::invalid_input("question must not be empty"));
        }

        let span = question_span!(mode = %mode);
        async {
            info!(question = %question, "Answering question");
            match mode {
                AskMode::Topics => self.ask_topics(question, title).await,
                AskMode::Agent => self.ask_agent(question).await,
                AskMode::Baseline => self.ask_baseline(question).await,
            }
        }
        .instrument(span)
        .await
    }

    async fn ask_topics(&self, question: &str, title: Option<&str>) -> QaResult<Answer> {
        let title = match title {
            Some(title) => self.corpus.get(title)?.title.clone(),
            None => self.pick_document(question).await?,
        };
        let document = self.corpus.get(&title)?;

        let tree = TopicTreeBuilder::new(self.config.corpus.skip_boilerplate)
            .build(&document.title, &document.text);
        let navigator = TopicNavigator::new(
            self.llm.clone(),
            NavigatorConfig::from_app_config(&self.config),
        );
        let navigation = navigator.answer(question, &tree).await?;

        Ok(Answer {
            mode: AskMode::Topics,
            sources: vec![navigation.breadcrumb()],
            answer: navigation.answer,
        })
    }

    /// Document a topics-mode question is about
    async fn pick_document(&self, question: &str) -> QaResult<String> {
        let extractor = EntityExtractor::from_app_config(self.llm.clone(), &self.config);
        let titles = extractor.resolve_documents(question, &self.gazetteer).await?;

        match titles.as_slice() {
            [] => Err(QaError::invalid_input(
                "no city from the corpus is mentioned in the question; pass --title",
            )),
            [only] => Ok(only.clone()),
            [first, ..] => {
                warn!(
                    candidates = ?titles,
                    chosen = %first,
                    "Question mentions several cities, navigating the first"
                );
                Ok(first.clone())
            }
        }
    }

    async fn ask_agent(&self, question: &str) -> QaResult<Answer> {
        let agent = self
            .top_agent
            .get_or_try_init(|| self.build_top_agent())
            .await?;
        let response = agent.chat(question).await?;

        Ok(Answer {
            mode: AskMode::Agent,
            sources: response.tool_calls.iter().map(|c| c.name.clone()).collect(),
            answer: response.answer,
        })
    }

    async fn build_top_agent(&self) -> QaResult<TopAgent> {
        let mut agents = Vec::with_capacity(self.corpus.len());
        for document in self.corpus.documents() {
            let agent = DocumentAgent::build(document, self.llm.clone(), &self.config).await?;
            agents.push(Arc::new(agent));
        }
        TopAgent::build(agents, self.llm.clone(), &self.config).await
    }

    async fn ask_baseline(&self, question: &str) -> QaResult<Answer> {
        let baseline = self
            .baseline
            .get_or_try_init(|| BaselineEngine::build(&self.corpus, self.llm.clone(), &self.config))
            .await?;
        let response = baseline.query(question).await?;

        Ok(Answer {
            mode: AskMode::Baseline,
            sources: response
                .source_nodes
                .iter()
                .map(|s| s.node.id.clone())
                .collect(),
            answer: response.answer,
        })
    }

    /// Answer questions line by line until EOF, `exit` or `quit`
    ///
    /// A failed question prints its error and the loop continues. Returns
    /// the number of questions answered successfully.
    pub async fn chat<R, W>(&self, mode: AskMode, input: R, mut output: W) -> std::io::Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut answered = 0;

        loop {
            output.write_all(b"> ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
                break;
            }

            match self.ask(question, mode, None).await {
                Ok(answer) => {
                    answered += 1;
                    output.write_all(format!("{answer}\n").as_bytes()).await?;
                }
                Err(e) => {
                    warn!(error = %e, "Question failed");
                    let message = format!("Error: {}\n", sanitize_error_message(&e.to_string()));
                    output.write_all(message.as_bytes()).await?;
                }
            }
        }

        Ok(answered)
    }
}

/// Topic tree of a configured document, loaded from the cache on its own
pub fn outline_tree(config: &AppConfig, title: &str) -> QaResult<TopicTree> {
    let document =
        Corpus::load_configured(&config.corpus.titles, title, &config.corpus.data_dir)?;
    Ok(TopicTreeBuilder::new(config.corpus.skip_boilerplate).build(&document.title, &document.text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Document;
    use crate::testing::{MockLlmProvider, MockTurn};

    fn corpus() -> Corpus {
        Corpus::new(vec![
            Document::new(
                "Boston",
                "Boston is old.\n== Culture ==\nMuseums and music.\n== Sports ==\nThe Red Sox.\n",
            ),
            Document::new("Seattle", "Seattle is rainy.\n== Economy ==\nCoffee and software.\n"),
        ])
    }

    fn session(turns: Vec<MockTurn>) -> (QaSession, Arc<MockLlmProvider>) {
        let llm = Arc::new(MockLlmProvider::scripted(turns));
        (QaSession::new(AppConfig::default(), corpus(), llm.clone()), llm)
    }

    #[tokio::test]
    async fn test_topics_with_explicit_title() {
        let (session, llm) = session(vec![
            MockTurn::call("sports"),
            MockTurn::text("The Red Sox."),
        ]);

        let answer = session
            .ask("Which baseball team?", AskMode::Topics, Some("boston"))
            .await
            .unwrap();
        assert_eq!(answer.answer, "The Red Sox.");
        assert_eq!(answer.sources, vec!["Boston > Sports"]);
        assert_eq!(llm.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_topics_resolves_title_from_entities() {
        let (session, _) = session(vec![
            MockTurn::text(r#"{"places": ["Seattle"], "topics": ["economy"]}"#),
            MockTurn::call("economy"),
            MockTurn::text("Coffee and software."),
        ]);

        let answer = session
            .ask("What drives the economy there?", AskMode::Topics, None)
            .await
            .unwrap();
        assert_eq!(answer.sources, vec!["Seattle > Economy"]);
    }

    #[tokio::test]
    async fn test_topics_without_any_city_is_invalid_input() {
        let (session, _) = session(vec![MockTurn::text(r#"{"places": [], "topics": []}"#)]);
        let result = session.ask("What is the weather?", AskMode::Topics, None).await;
        assert!(matches!(result, Err(QaError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_unknown_title_is_corpus_error() {
        let (session, _) = session(vec![]);
        let result = session.ask("Anything?", AskMode::Topics, Some("Denver")).await;
        assert!(matches!(result, Err(QaError::Corpus(_))));
    }

    #[tokio::test]
    async fn test_chat_continues_after_errors_and_stops_on_quit() {
        let (session, _) = session(vec![
            MockTurn::text("no entities here"),
            MockTurn::text("Seattle is rainy."),
            MockTurn::text("{}"),
            MockTurn::call("nightlife"),
            MockTurn::text("Unused."),
        ]);
        let input: &[u8] = b"\nTell me about Seattle\nWhat about Boston nightlife?\nquit\nNever asked\n";
        let mut output = Vec::new();

        let answered = session
            .chat(AskMode::Topics, input, &mut output)
            .await
            .unwrap();
        let output = String::from_utf8(output).unwrap();

        assert_eq!(answered, 1);
        assert!(output.contains("Seattle is rainy."));
        assert!(output.contains("Error: Navigation error: Model called unknown function 'nightlife'"));
        assert!(!output.contains("Unused."));
    }

    #[test]
    fn test_outline_tree_accepts_lowercase_title() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Boston.txt"),
            "Boston is old.\n== Culture ==\nMuseums.\n== Sports ==\nThe Red Sox.\n",
        )
        .unwrap();
        let mut config = AppConfig::default();
        config.corpus.titles = vec!["Seattle".to_string(), "Boston".to_string()];
        config.corpus.data_dir = dir.path().to_path_buf();

        let tree = outline_tree(&config, "boston").unwrap();
        assert_eq!(tree.title(), "Boston");
        assert_eq!(tree.root().child_function_names(), vec!["culture", "sports"]);

        assert!(matches!(
            outline_tree(&config, "../Boston"),
            Err(QaError::Corpus(_))
        ));
    }

    #[test]
    fn test_answer_display() {
        let answer = Answer {
            mode: AskMode::Baseline,
            answer: "Yes.".to_string(),
            sources: vec!["Boston#0".to_string(), "Boston#3".to_string()],
        };
        assert_eq!(answer.to_string(), "Yes.\n\n[baseline] Boston#0, Boston#3");
    }
}
