use clap::Parser;
use std::path::PathBuf;

use crate::models::{EmptyPagePolicy, KillSignal, OutputFormat, SortKey};

#[derive(Parser, Debug)]
#[command(name = "statuswatch")]
#[command(about = "Inspect, check and terminate web-server workers via the server-status page")]
#[command(version)]
pub struct Cli {
    /// Status server as host:port
    #[arg(long)]
    pub host: Option<String>,

    /// Minimum number of matching processes required
    #[arg(long)]
    pub minprocs: Option<usize>,

    /// Do not print the process table
    #[arg(short, long)]
    pub quiet: bool,

    /// Signal every matching process
    #[arg(long)]
    pub kill: bool,

    /// Signal sent by --kill (TERM, KILL, HUP, INT)
    #[arg(long)]
    pub signal: Option<KillSignal>,

    /// Log what --kill would do without sending anything
    #[arg(long)]
    pub dry_run: bool,

    /// Only keep workers in these scoreboard modes, e.g. "WR"
    #[arg(long)]
    pub mode: Option<String>,

    /// Include idle workers and open slots
    #[arg(long)]
    pub all: bool,

    /// Only keep workers whose current request is at least this old (seconds)
    #[arg(long)]
    pub min_seconds: Option<u64>,

    /// Only keep workers using at least this much CPU
    #[arg(long)]
    pub min_cpu: Option<f64>,

    /// Regex the virtual host must match
    #[arg(long)]
    pub vhost: Option<String>,

    /// Regex the client address must match
    #[arg(long)]
    pub client: Option<String>,

    /// Regex the request line must match
    #[arg(long)]
    pub request: Option<String>,

    /// Keep workers serving any /server-status request, from this tool or other clients
    #[arg(long)]
    pub include_self: bool,

    /// Display order
    #[arg(long, value_enum, default_value_t = SortKey::None)]
    pub sort: SortKey,

    /// Display format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// HTTP timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Treat a page without a scoreboard as an error or as zero processes
    #[arg(long, value_enum)]
    pub empty_page: Option<EmptyPagePolicy>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,
}
