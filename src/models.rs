use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One row of the `mod_status` scoreboard table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub server: String,
    pub pid: Option<u32>,
    pub accesses: String,
    pub mode: WorkerMode,
    pub cpu: f64,
    pub seconds: u64,
    pub request_ms: u64,
    pub duration_ms: Option<u64>, // Apache 2.4 only
    pub conn_kb: f64,
    pub child_mb: f64,
    pub slot_mb: f64,
    pub client: String,
    pub protocol: Option<String>, // Apache 2.4 only
    pub vhost: String,
    pub request: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerMode {
    Waiting,
    Starting,
    Reading,
    Sending,
    Keepalive,
    DnsLookup,
    Closing,
    Logging,
    Finishing,
    IdleCleanup,
    OpenSlot,
    Unknown(char),
}

impl WorkerMode {
    pub fn from_char(c: char) -> Self {
        match c {
            '_' => WorkerMode::Waiting,
            'S' => WorkerMode::Starting,
            'R' => WorkerMode::Reading,
            'W' => WorkerMode::Sending,
            'K' => WorkerMode::Keepalive,
            'D' => WorkerMode::DnsLookup,
            'C' => WorkerMode::Closing,
            'L' => WorkerMode::Logging,
            'G' => WorkerMode::Finishing,
            'I' => WorkerMode::IdleCleanup,
            '.' => WorkerMode::OpenSlot,
            other => WorkerMode::Unknown(other),
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            WorkerMode::Waiting => '_',
            WorkerMode::Starting => 'S',
            WorkerMode::Reading => 'R',
            WorkerMode::Sending => 'W',
            WorkerMode::Keepalive => 'K',
            WorkerMode::DnsLookup => 'D',
            WorkerMode::Closing => 'C',
            WorkerMode::Logging => 'L',
            WorkerMode::Finishing => 'G',
            WorkerMode::IdleCleanup => 'I',
            WorkerMode::OpenSlot => '.',
            WorkerMode::Unknown(c) => *c,
        }
    }

    /// Waiting workers and open slots are idle; everything else is doing work.
    pub fn is_busy(&self) -> bool {
        !matches!(self, WorkerMode::Waiting | WorkerMode::OpenSlot)
    }

    /// Parses a run of mode letters such as `WR` or `W,K`.
    pub fn parse_list(input: &str) -> Vec<WorkerMode> {
        input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .map(WorkerMode::from_char)
            .collect()
    }
}

impl fmt::Display for WorkerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KillSignal {
    #[default]
    Term,
    Kill,
    Hup,
    Int,
}

impl fmt::Display for KillSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KillSignal::Term => "SIGTERM",
            KillSignal::Kill => "SIGKILL",
            KillSignal::Hup => "SIGHUP",
            KillSignal::Int => "SIGINT",
        };
        f.write_str(name)
    }
}

impl FromStr for KillSignal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_uppercase();
        match name.strip_prefix("SIG").unwrap_or(&name) {
            "TERM" | "15" => Ok(KillSignal::Term),
            "KILL" | "9" => Ok(KillSignal::Kill),
            "HUP" | "1" => Ok(KillSignal::Hup),
            "INT" | "2" => Ok(KillSignal::Int),
            _ => Err(anyhow::anyhow!("Unsupported signal: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortKey {
    #[default]
    None,
    Pid,
    Seconds,
    Cpu,
    RequestTime,
    Client,
    Vhost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// What to do with a page that carries no scoreboard table at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmptyPagePolicy {
    #[default]
    Error,
    Zero,
}
