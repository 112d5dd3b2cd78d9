mod cli;
mod config;
mod control;
mod display;
mod engine;
mod fetch;
mod filter;
mod models;
mod parser;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, IsTerminal};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::{AppConfig, Options};
use crate::control::SignalController;
use crate::display::{JsonReporter, Reporter, TableReporter};
use crate::engine::{Engine, Outcome, EXIT_CONFIG, EXIT_OK};
use crate::fetch::HttpFetcher;
use crate::models::OutputFormat;
use crate::parser::ScoreboardParser;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(usage_exit_code(&e));
        }
    };

    let outcome = match run(cli).await {
        Ok(outcome) => outcome,
        Err(e) => Outcome::failure(EXIT_CONFIG, format!("{:#}", e)),
    };

    if let Some(message) = &outcome.message {
        eprintln!("{}", message);
    }
    std::process::exit(outcome.code);
}

/// `--help` and `--version` also arrive as errors. Real usage errors use
/// `EXIT_CONFIG` rather than clap's 2, which means "below --minprocs" here.
fn usage_exit_code(error: &clap::Error) -> i32 {
    if error.use_stderr() {
        EXIT_CONFIG
    } else {
        EXIT_OK
    }
}

async fn run(cli: Cli) -> Result<Outcome> {
    let config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(cli.log_level.as_deref(), &config.log_level);

    let options = Options::resolve(&cli, &config)?;
    let attended = io::stdout().is_terminal();
    debug!("Resolved options: {:?} (attended: {})", options, attended);

    let fetcher = HttpFetcher::new(options.timeout).context("Failed to build HTTP client")?;
    let parser = ScoreboardParser::new().context("Failed to build status parser")?;
    let controller = SignalController;
    let mut reporter: Box<dyn Reporter> = match options.format {
        OutputFormat::Table => Box::new(TableReporter::new(
            io::stdout(),
            options.host.clone(),
            options.sort,
        )),
        OutputFormat::Json => Box::new(JsonReporter::new(io::stdout(), options.sort)),
    };

    let outcome = Engine::new(&fetcher, &parser, reporter.as_mut(), &controller)
        .run(&options, attended)
        .await;
    Ok(outcome)
}

/// `--log-level` wins, then `RUST_LOG`, then the config file.
fn init_tracing(cli_level: Option<&str>, config_level: &str) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
