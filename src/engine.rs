use tracing::{info, warn};

use crate::config::Options;
use crate::control::{kill_procs, ProcessController};
use crate::display::Reporter;
use crate::fetch::{status_url, StatusFetcher};
use crate::filter::filter_procs;
use crate::models::EmptyPagePolicy;
use crate::parser::{ParseError, StatusParser};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_BELOW_MINPROCS: i32 = 2;
pub const EXIT_PARSE_FAILED: i32 = 3;
pub const EXIT_CONFIG: i32 = 64;

/// How a run ended. `message`, when present, belongs on stderr.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub code: i32,
    pub message: Option<String>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            code: EXIT_OK,
            message: None,
        }
    }

    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }
}

pub struct Engine<'a> {
    fetcher: &'a dyn StatusFetcher,
    parser: &'a dyn StatusParser,
    reporter: &'a mut dyn Reporter,
    controller: &'a dyn ProcessController,
}

impl<'a> Engine<'a> {
    pub fn new(
        fetcher: &'a dyn StatusFetcher,
        parser: &'a dyn StatusParser,
        reporter: &'a mut dyn Reporter,
        controller: &'a dyn ProcessController,
    ) -> Self {
        Self {
            fetcher,
            parser,
            reporter,
            controller,
        }
    }

    /// Fetch, filter, check `minprocs`, then display and/or kill.
    ///
    /// `attended` is whether stdout is a terminal. Below the threshold an
    /// attended run fails loudly while an unattended one exits 0 silently.
    pub async fn run(&mut self, options: &Options, attended: bool) -> Outcome {
        let fetched = match status_url(&options.host) {
            Ok(url) => self.fetcher.fetch(&url).await,
            Err(e) => Err(e),
        };
        let body = match fetched {
            Ok(body) => body,
            Err(e) => {
                return Outcome::failure(
                    EXIT_FAILURE,
                    format!("Failed to read from {}: {}", options.host, e),
                )
            }
        };

        let records = match self.parser.parse(&body) {
            Ok(records) => records,
            Err(ParseError::NoScoreboard) if options.empty_page == EmptyPagePolicy::Zero => {
                warn!("⚠️ No scoreboard on {}, counting zero processes", options.host);
                Vec::new()
            }
            Err(e) => {
                return Outcome::failure(
                    EXIT_PARSE_FAILED,
                    format!("Failed to parse status page from {}: {}", options.host, e),
                )
            }
        };

        let parsed = records.len();
        let procs = filter_procs(records, &options.filter);
        info!(
            "📊 {} of {} scoreboard entries on {} match",
            procs.len(),
            parsed,
            options.host
        );

        if procs.len() < options.minprocs {
            if attended {
                return Outcome::failure(
                    EXIT_BELOW_MINPROCS,
                    format!(
                        "Number of active procs ({}) is less than --minprocs ({}), quitting",
                        procs.len(),
                        options.minprocs
                    ),
                );
            }
            info!("Below --minprocs on an unattended run, exiting quietly");
            return Outcome::success();
        }

        if !options.quiet {
            if let Err(e) = self.reporter.display(&procs, parsed) {
                return Outcome::failure(EXIT_FAILURE, format!("Failed to write report: {}", e));
            }
        }

        if options.kill {
            let summary = kill_procs(&procs, options.signal, options.dry_run, self.controller);
            let line = format!(
                "{} {} to {} processes, {} failed",
                if options.dry_run { "Would send" } else { "Sent" },
                options.signal,
                summary.signalled.len(),
                summary.failed.len()
            );

            // Attended runs get the summary on stderr regardless of log level.
            if attended {
                return Outcome {
                    code: EXIT_OK,
                    message: Some(line),
                };
            }
            if summary.failed.is_empty() {
                info!("✅ {}", line);
            } else {
                warn!("⚠️ {}: {:?}", line, summary.failed);
            }
        }

        Outcome::success()
    }
}
