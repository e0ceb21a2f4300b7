//! cityqa - command line entry point

use cityqa::config::AppConfig;
use cityqa::corpus::{Corpus, WikipediaClient, WikipediaConfig};
use cityqa::error::sanitize_error_message;
use cityqa::llm::providers::{OpenAiConfig, OpenAiProvider};
use cityqa::llm::LlmProvider;
use cityqa::observability::init_default_logging;
use cityqa::session::{outline_tree, AskMode, QaSession};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{error, info};

/// Question answering over Wikipedia city articles
#[derive(Parser)]
#[command(name = "cityqa")]
#[command(about = "Ask questions about Wikipedia city articles")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the configured articles into the data directory
    Fetch {
        /// Download again even if already cached
        #[arg(long)]
        refresh: bool,
    },
    /// Print the section tree of a cached article
    Outline {
        /// Article title
        title: String,
    },
    /// Answer a single question
    Ask {
        question: String,
        #[arg(long, value_enum, default_value_t = AskMode::Topics)]
        mode: AskMode,
        /// Article to navigate in topics mode (detected from the question otherwise)
        #[arg(long)]
        title: Option<String>,
    },
    /// Answer questions read from stdin until EOF, `exit` or `quit`
    Chat {
        #[arg(long, value_enum, default_value_t = AskMode::Topics)]
        mode: AskMode,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging(cli.verbose);

    info!("Starting cityqa v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Error: {}", sanitize_error_message(&e.to_string()));
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Fetch { refresh } => fetch_corpus(&config, refresh).await,
        Commands::Outline { title } => print_outline(&config, &title),
        Commands::Ask {
            question,
            mode,
            title,
        } => ask_question(config, &question, mode, title.as_deref()).await,
        Commands::Chat { mode } => run_chat(config, mode).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        eprintln!("Error: {}", sanitize_error_message(&e.to_string()));
        process::exit(1);
    }
}

/// Explicit path, else the first default location present, else defaults
fn load_configuration(config_path: &Option<PathBuf>) -> CliResult<AppConfig> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(AppConfig::load_from_file(path)?)
        }
        None => {
            let default_paths = ["cityqa.toml", "config/cityqa.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(AppConfig::load_from_file(&path)?);
                }
            }

            info!("No configuration file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Provider factory for creating LLM providers from configuration
struct LlmProviderFactory;

impl LlmProviderFactory {
    fn create_provider(config: &AppConfig) -> CliResult<Arc<dyn LlmProvider>> {
        match config.llm.provider.as_str() {
            "openai" => {
                let provider = OpenAiProvider::new(OpenAiConfig::from_app_config(config)?)?;
                Ok(Arc::new(provider))
            }
            provider => Err(format!("Unsupported LLM provider: {provider}").into()),
        }
    }
}

async fn fetch_corpus(config: &AppConfig, refresh: bool) -> CliResult<()> {
    let client = WikipediaClient::new(WikipediaConfig {
        api_url: config.corpus.api_url.clone(),
        timeout: Duration::from_secs(config.llm.timeout_secs),
    })?;

    let report = Corpus::fetch(
        &config.corpus.titles,
        &config.corpus.data_dir,
        &client,
        refresh,
    )
    .await?;

    for title in &report.downloaded {
        println!("downloaded  {title}");
    }
    for title in &report.cached {
        println!("cached      {title}");
    }
    println!(
        "{} downloaded, {} already cached in {}",
        report.downloaded.len(),
        report.cached.len(),
        config.corpus.data_dir.display()
    );
    Ok(())
}

fn print_outline(config: &AppConfig, title: &str) -> CliResult<()> {
    let tree = outline_tree(config, title)?;

    print!("{}", tree.outline());
    println!("{} sections, depth {}", tree.node_count(), tree.depth());
    Ok(())
}

fn build_session(config: AppConfig) -> CliResult<QaSession> {
    let corpus = Corpus::load(&config.corpus.titles, &config.corpus.data_dir)?;
    let llm = LlmProviderFactory::create_provider(&config)?;
    info!(documents = corpus.len(), provider = llm.name(), "Session ready");
    Ok(QaSession::new(config, corpus, llm))
}

async fn ask_question(
    config: AppConfig,
    question: &str,
    mode: AskMode,
    title: Option<&str>,
) -> CliResult<()> {
    let session = build_session(config)?;
    let answer = session.ask(question, mode, title).await?;
    println!("{answer}");
    Ok(())
}

async fn run_chat(config: AppConfig, mode: AskMode) -> CliResult<()> {
    let session = build_session(config)?;
    let stdin = BufReader::new(tokio::io::stdin());
    let answered = session.chat(mode, stdin, tokio::io::stdout()).await?;
    info!(answered, "Chat finished");
    Ok(())
}

fn handle_config_command(config: &AppConfig, show: bool) -> CliResult<()> {
    config.validate()?;
    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!("Configuration validation complete");
    println!("Configuration is valid");
    Ok(())
}
