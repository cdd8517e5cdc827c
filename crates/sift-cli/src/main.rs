use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use sift_chat::{
    AuthPolicy, ContentAnalyzer, InMemoryHistory, Orchestrator, OrchestratorConfig, PageAnalyst,
};
use sift_providers::AnthropicProvider;
use sift_web::{HttpFetcher, SearxngSearch};

mod chat;
mod config;

use config::Config;

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Most verbose: request/response payloads
    Trace,
    /// Verbose: LLM requests/responses, per-page analysis details
    Debug,
    /// Standard: high-level pipeline flow, search decisions, costs
    Info,
    /// Quiet: only warnings and errors
    Warn,
    /// Minimal: only errors
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "sift")]
#[command(author, version, about = "Sift: a search-augmented chat bot", long_about = None)]
pub struct Cli {
    /// Prompt to send (for one-shot mode; omit for interactive chat)
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// User id to act as (histories and authorization are keyed by it)
    #[arg(short, long, default_value = "local")]
    pub user: String,

    /// Path to the config file (default: ~/.config/sift/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Enable debug logging (shorthand for --log-level debug)
    #[arg(short, long)]
    pub debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level.as_filter()))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let orchestrator = build_orchestrator(&config)?;
    let auth = AuthPolicy::allow_users(config.auth.allowed_users.clone());

    if let Some(prompt) = &cli.prompt {
        if !auth.permits(&cli.user) {
            println!("You are not authorized to use this bot.");
            return Ok(());
        }
        let reply = orchestrator.respond(&cli.user, prompt).await;
        println!("{}", reply);
        Ok(())
    } else {
        chat::run(&orchestrator, &auth, &cli.user).await
    }
}

/// Wire the pipeline from configuration: one shared provider handle, web
/// adapters, analyzer, history store.
fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let api_key = config.api_key()?;

    let mut provider = AnthropicProvider::new(api_key);
    if let Some(base_url) = &config.provider.base_url {
        provider = provider.with_base_url(base_url);
    }
    let provider = Arc::new(provider);

    let search = Arc::new(SearxngSearch::new(config.search.host.clone()));
    let fetcher = Arc::new(HttpFetcher::new());

    let analyzer = ContentAnalyzer::new(
        provider.clone(),
        config.models.analysis.clone(),
        config.models.analysis_max_tokens,
        config.pricing.analysis,
    );
    let analyst = PageAnalyst::new(fetcher, analyzer);

    let history = Arc::new(InMemoryHistory::new(config.history.max_turns));

    let orchestrator_config = OrchestratorConfig {
        decision_model: config.models.decision.clone(),
        decision_max_tokens: config.models.decision_max_tokens,
        answer_model: config.models.answer.clone(),
        answer_max_tokens: config.models.answer_max_tokens,
        max_search_results: config.search.max_results,
        search_on_decision_error: config.pipeline.search_on_decision_error,
        decision_prices: config.pricing.decision,
    };

    Ok(Orchestrator::new(
        provider,
        search,
        analyst,
        history,
        orchestrator_config,
    ))
}
