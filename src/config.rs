use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::cli::Cli;
use crate::filter::FilterCriteria;
use crate::models::{EmptyPagePolicy, KillSignal, OutputFormat, SortKey, WorkerMode};

/// Picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "statuswatch.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub minprocs: usize,
    pub timeout_secs: u64,
    pub log_level: String,
    pub signal: KillSignal,
    pub empty_page: EmptyPagePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "localhost:80".to_string(),
            minprocs: 0,
            timeout_secs: 5,
            log_level: "warn".to_string(),
            signal: KillSignal::Term,
            empty_page: EmptyPagePolicy::Error,
        }
    }
}

impl AppConfig {
    /// An explicit path must exist; the implicit one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(AppConfig::default()),
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }
}

/// Run configuration, resolved once from defaults, config file and flags.
#[derive(Debug, Clone)]
pub struct Options {
    pub host: String,
    pub minprocs: usize,
    pub quiet: bool,
    pub kill: bool,
    pub signal: KillSignal,
    pub dry_run: bool,
    pub filter: FilterCriteria,
    pub sort: SortKey,
    pub format: OutputFormat,
    pub timeout: Duration,
    pub empty_page: EmptyPagePolicy,
}

impl Options {
    pub fn resolve(cli: &Cli, config: &AppConfig) -> Result<Self> {
        let filter = FilterCriteria {
            modes: cli.mode.as_deref().map(WorkerMode::parse_list),
            include_idle: cli.all,
            min_seconds: cli.min_seconds,
            min_cpu: cli.min_cpu,
            vhost: compile_pattern("--vhost", cli.vhost.as_deref())?,
            client: compile_pattern("--client", cli.client.as_deref())?,
            request: compile_pattern("--request", cli.request.as_deref())?,
            include_self: cli.include_self,
        };

        Ok(Self {
            host: cli.host.clone().unwrap_or_else(|| config.host.clone()),
            minprocs: cli.minprocs.unwrap_or(config.minprocs),
            quiet: cli.quiet,
            kill: cli.kill,
            signal: cli.signal.unwrap_or(config.signal),
            dry_run: cli.dry_run,
            filter,
            sort: cli.sort,
            format: cli.format,
            timeout: Duration::from_secs(cli.timeout.unwrap_or(config.timeout_secs)),
            empty_page: cli.empty_page.unwrap_or(config.empty_page),
        })
    }
}

fn compile_pattern(flag: &str, pattern: Option<&str>) -> Result<Option<Regex>> {
    pattern
        .map(|p| Regex::new(p).with_context(|| format!("Invalid {} pattern '{}'", flag, p)))
        .transpose()
}
