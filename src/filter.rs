use regex::Regex;

use crate::fetch::STATUS_PATH;
use crate::models::{ProcessRecord, WorkerMode};

/// Selection rules applied to the parsed scoreboard. All conditions must hold.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub modes: Option<Vec<WorkerMode>>,
    pub include_idle: bool,
    pub min_seconds: Option<u64>,
    pub min_cpu: Option<f64>,
    pub vhost: Option<Regex>,
    pub client: Option<Regex>,
    pub request: Option<Regex>,
    pub include_self: bool,
}

impl FilterCriteria {
    pub fn matches(&self, record: &ProcessRecord) -> bool {
        if record.pid.is_none() {
            return false;
        }

        let mode_ok = match &self.modes {
            Some(modes) => modes.contains(&record.mode),
            None => self.include_idle || record.mode.is_busy(),
        };
        if !mode_ok {
            return false;
        }

        if !self.include_self && is_status_request(&record.request) {
            return false;
        }

        if self.min_seconds.is_some_and(|min| record.seconds < min) {
            return false;
        }
        if self.min_cpu.is_some_and(|min| record.cpu < min) {
            return false;
        }

        pattern_matches(&self.vhost, &record.vhost)
            && pattern_matches(&self.client, &record.client)
            && pattern_matches(&self.request, &record.request)
    }
}

/// Keeps the records matching `criteria`, in their original order.
pub fn filter_procs(records: Vec<ProcessRecord>, criteria: &FilterCriteria) -> Vec<ProcessRecord> {
    records
        .into_iter()
        .filter(|record| criteria.matches(record))
        .collect()
}

fn pattern_matches(pattern: &Option<Regex>, value: &str) -> bool {
    pattern.as_ref().map_or(true, |re| re.is_match(value))
}

// Request lines look like "GET /server-status?auto HTTP/1.1".
fn is_status_request(request: &str) -> bool {
    request
        .split_whitespace()
        .nth(1)
        .map(|target| target.split('?').next().unwrap_or(target) == STATUS_PATH)
        .unwrap_or(false)
}
