use chrono::Local;
use std::cmp::Ordering;
use std::io::{self, Write};

use crate::models::{ProcessRecord, SortKey};

const REQUEST_WIDTH: usize = 48;
const VHOST_WIDTH: usize = 24;
const CLIENT_WIDTH: usize = 15;

pub trait Reporter {
    /// `total` is the number of scoreboard entries before filtering.
    fn display(&mut self, records: &[ProcessRecord], total: usize) -> io::Result<()>;
}

/// Returns a sorted copy; the caller's list keeps its scoreboard order.
pub fn sort_records(records: &[ProcessRecord], key: SortKey) -> Vec<ProcessRecord> {
    let mut sorted = records.to_vec();
    let by: fn(&ProcessRecord, &ProcessRecord) -> Ordering = match key {
        SortKey::None => return sorted,
        SortKey::Pid => |a, b| a.pid.cmp(&b.pid),
        SortKey::Seconds => |a, b| b.seconds.cmp(&a.seconds),
        SortKey::Cpu => |a, b| b.cpu.total_cmp(&a.cpu),
        SortKey::RequestTime => |a, b| b.request_ms.cmp(&a.request_ms),
        SortKey::Client => |a, b| a.client.cmp(&b.client),
        SortKey::Vhost => |a, b| a.vhost.cmp(&b.vhost),
    };
    sorted.sort_by(by);
    sorted
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// `top`-style table with a one-line summary header.
pub struct TableReporter<W: Write> {
    out: W,
    host: String,
    sort: SortKey,
}

impl<W: Write> TableReporter<W> {
    pub fn new(out: W, host: impl Into<String>, sort: SortKey) -> Self {
        Self {
            out,
            host: host.into(),
            sort,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for TableReporter<W> {
    fn display(&mut self, records: &[ProcessRecord], total: usize) -> io::Result<()> {
        writeln!(
            self.out,
            "{} at {}: {} of {} processes match",
            self.host,
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            records.len(),
            total
        )?;
        writeln!(
            self.out,
            "{:>7} {} {:>6} {:>6} {:>7} {:<cw$} {:<vw$} {}",
            "PID",
            "M",
            "SS",
            "CPU",
            "REQ",
            "CLIENT",
            "VHOST",
            "REQUEST",
            cw = CLIENT_WIDTH,
            vw = VHOST_WIDTH,
        )?;

        for record in sort_records(records, self.sort) {
            let pid = record.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
            writeln!(
                self.out,
                "{:>7} {} {:>6} {:>6.2} {:>7} {:<cw$} {:<vw$} {}",
                pid,
                record.mode,
                record.seconds,
                record.cpu,
                record.request_ms,
                truncate(&record.client, CLIENT_WIDTH),
                truncate(&record.vhost, VHOST_WIDTH),
                truncate(&record.request, REQUEST_WIDTH),
                cw = CLIENT_WIDTH,
                vw = VHOST_WIDTH,
            )?;
        }

        self.out.flush()
    }
}

/// Pretty-printed JSON array, for piping into other tools.
pub struct JsonReporter<W: Write> {
    out: W,
    sort: SortKey,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W, sort: SortKey) -> Self {
        Self { out, sort }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn display(&mut self, records: &[ProcessRecord], _total: usize) -> io::Result<()> {
        let sorted = sort_records(records, self.sort);
        serde_json::to_writer_pretty(&mut self.out, &sorted)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::record;

    fn sample() -> Vec<ProcessRecord> {
        let mut a = record(30, 'W', 5, "GET /a HTTP/1.1");
        a.cpu = 0.5;
        let mut b = record(10, 'R', 50, "GET /b HTTP/1.1");
        b.cpu = 2.0;
        let c = record(20, 'K', 1, "GET /c HTTP/1.1");
        vec![a, b, c]
    }

    fn pids(records: &[ProcessRecord]) -> Vec<u32> {
        records.iter().filter_map(|r| r.pid).collect()
    }

    #[test]
    fn sorting_returns_a_reordered_copy() {
        let records = sample();
        assert_eq!(pids(&sort_records(&records, SortKey::Pid)), vec![10, 20, 30]);
        assert_eq!(pids(&sort_records(&records, SortKey::Seconds)), vec![10, 30, 20]);
        assert_eq!(pids(&sort_records(&records, SortKey::Cpu)), vec![10, 30, 20]);
        assert_eq!(pids(&sort_records(&records, SortKey::None)), vec![30, 10, 20]);
        assert_eq!(pids(&records), vec![30, 10, 20]);
    }

    #[test]
    fn truncates_long_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn table_lists_every_record() {
        let mut reporter = TableReporter::new(Vec::new(), "localhost:10080", SortKey::Seconds);
        reporter.display(&sample(), 8).unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("localhost:10080 at "));
        assert!(lines[0].ends_with("3 of 8 processes match"));
        assert!(lines[1].contains("PID"));
        assert!(lines[2].trim_start().starts_with("10 R"));
        assert!(lines[2].contains("GET /b HTTP/1.1"));
    }

    #[test]
    fn json_output_is_an_array_of_records() {
        let mut reporter = JsonReporter::new(Vec::new(), SortKey::Pid);
        reporter.display(&sample(), 3).unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();

        let parsed: Vec<ProcessRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(pids(&parsed), vec![10, 20, 30]);
    }
}
