use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::models::{ProcessRecord, WorkerMode};

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("no scoreboard table found (is ExtendedStatus enabled?)")]
    NoScoreboard,
}

pub trait StatusParser {
    fn parse(&self, text: &str) -> Result<Vec<ProcessRecord>, ParseError>;
}

/// Parses the extended `mod_status` HTML scoreboard.
///
/// Columns are located by header name, so the Apache 2.2 layout and the 2.4
/// layout (which adds `Dur` and `Protocol`) both work. A page without a
/// scoreboard header is `NoScoreboard`; a header with no rows is an empty list.
pub struct ScoreboardParser {
    row_re: Regex,
    cell_re: Regex,
    tag_re: Regex,
    space_re: Regex,
}

impl ScoreboardParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            row_re: Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>")?,
            cell_re: Regex::new(r"(?is)<t[dh][^>]*>(.*?)</t[dh]>")?,
            tag_re: Regex::new(r"(?s)<[^>]*>")?,
            space_re: Regex::new(r"\s+")?,
        })
    }

    fn cells(&self, row: &str) -> Vec<String> {
        self.cell_re
            .captures_iter(row)
            .filter_map(|caps| caps.get(1))
            .map(|m| self.clean_cell(m.as_str()))
            .collect()
    }

    fn clean_cell(&self, raw: &str) -> String {
        let text = self.tag_re.replace_all(raw, "");
        let text = self.space_re.replace_all(&text, " ");
        decode_entities(text.trim())
    }

    fn parse_row(columns: &HashMap<String, usize>, cells: &[String]) -> Option<ProcessRecord> {
        let get = |name: &str| columns.get(name).and_then(|&i| cells.get(i)).map(String::as_str);
        let text = |name: &str| get(name).unwrap_or_default().to_string();

        let pid = match get("PID")? {
            "-" | "" => None,
            value => Some(value.parse::<u32>().ok()?),
        };
        let mode = WorkerMode::from_char(get("M")?.chars().next()?);

        Some(ProcessRecord {
            server: text("Srv"),
            pid,
            accesses: text("Acc"),
            mode,
            cpu: parse_number(get("CPU"))?,
            seconds: parse_number(get("SS"))?,
            request_ms: parse_number(get("Req"))?,
            duration_ms: match get("Dur") {
                Some(value) => Some(value.parse().ok()?),
                None => None,
            },
            conn_kb: parse_number(get("Conn"))?,
            child_mb: parse_number(get("Child"))?,
            slot_mb: parse_number(get("Slot"))?,
            client: text("Client"),
            protocol: get("Protocol").map(str::to_string),
            vhost: text("VHost"),
            request: text("Request"),
        })
    }
}

impl StatusParser for ScoreboardParser {
    fn parse(&self, text: &str) -> Result<Vec<ProcessRecord>, ParseError> {
        let mut columns: Option<HashMap<String, usize>> = None;
        let mut records = Vec::new();

        for caps in self.row_re.captures_iter(text) {
            let Some(row) = caps.get(1) else { continue };
            let cells = self.cells(row.as_str());

            match &columns {
                None => {
                    if cells.iter().any(|c| c == "PID") && cells.iter().any(|c| c == "M") {
                        columns = Some(
                            cells
                                .iter()
                                .enumerate()
                                .map(|(i, name)| (name.clone(), i))
                                .collect(),
                        );
                    }
                }
                Some(header) => {
                    if cells.len() < header.len() {
                        continue;
                    }
                    match Self::parse_row(header, &cells) {
                        Some(record) => records.push(record),
                        None => debug!("Skipping unparseable scoreboard row: {:?}", cells),
                    }
                }
            }
        }

        if columns.is_none() {
            return Err(ParseError::NoScoreboard);
        }

        debug!("Parsed {} scoreboard rows", records.len());
        Ok(records)
    }
}

/// Absent columns read as zero; present but malformed ones reject the row.
fn parse_number<T: std::str::FromStr + Default>(value: Option<&str>) -> Option<T> {
    match value {
        None => Some(T::default()),
        Some(v) => v.parse().ok(),
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const APACHE_22_PAGE: &str = r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 3.2 Final//EN">
<html><head>
<title>Apache Status</title>
</head><body>
<h1>Apache Server Status for localhost</h1>
<pre>WW_K_....</pre>
<table border="0"><tr><th>Srv</th><th>PID</th><th>Acc</th><th>M</th><th>CPU
</th><th>SS</th><th>Req</th><th>Conn</th><th>Child</th><th>Slot</th><th>Client</th><th>VHost</th><th>Request</th></tr>

<tr><td><b>0-0</b></td><td>5001201</td><td>0/12/12</td><td><b>W</b>
</td><td>0.02</td><td>0</td><td>0</td><td>0.0</td><td>0.05</td><td>0.05
</td><td>127.0.0.1</td><td nowrap>localhost:80</td><td nowrap>GET /server-status HTTP/1.1</td></tr>

<tr><td><b>1-0</b></td><td>5001202</td><td>3/40/40</td><td><b>W</b>
</td><td>1.50</td><td>95</td><td>12</td><td>4.2</td><td>0.31</td><td>0.31
</td><td>10.0.0.7</td><td nowrap>shop.example.com:80</td><td nowrap>POST /checkout?a=1&amp;b=2 HTTP/1.1</td></tr>

<tr><td><b>2-0</b></td><td>5001203</td><td>0/5/5</td><td>_
</td><td>0.00</td><td>3</td><td>1</td><td>0.0</td><td>0.01</td><td>0.01
</td><td>10.0.0.8</td><td nowrap>shop.example.com:80</td><td nowrap>GET / HTTP/1.1</td></tr>

<tr><td><b>3-0</b></td><td>5001204</td><td>1/9/9</td><td><b>K</b>
</td><td>0.10</td><td>1</td><td>2</td><td>0.3</td><td>0.02</td><td>0.02
</td><td>10.0.0.9</td><td nowrap>blog.example.com:80</td><td nowrap>GET /feed HTTP/1.1</td></tr>

<tr><td><b>4-0</b></td><td>-</td><td>0/0/0</td><td>.
</td><td>0.00</td><td>1503</td><td>0</td><td>0.0</td><td>0.00</td><td>0.00
</td><td>::1</td><td nowrap></td><td nowrap></td></tr>

</table>
<hr /> <table>
 <tr><th>Srv</th><td>Child Server number - generation</td></tr>
 <tr><th>PID</th><td>OS process ID</td></tr>
 <tr><th>M</th><td>Mode of operation</td></tr>
</table>
</body></html>"#;

    const APACHE_24_PAGE: &str = r#"<html><body>
<table rules="all" cellpadding="1%">
<tr><th rowspan="2">Slot</th><th rowspan="2">PID</th><th rowspan="2">Stopping</th></tr>
<tr><td>0</td><td>2201</td><td>no</td></tr>
</table>
<table border="0"><tr><th>Srv</th><th>PID</th><th>Acc</th><th>M</th><th>CPU
</th><th>SS</th><th>Req</th><th>Dur</th><th>Conn</th><th>Child</th><th>Slot</th><th>Client</th><th>Protocol</th><th>VHost</th><th>Request</th></tr>

<tr><td><b>0-0</b></td><td>2201</td><td>1/3/3</td><td><b>R</b>
</td><td>0.00</td><td>7</td><td>0</td><td>41</td><td>0.0</td><td>0.01</td><td>0.01
</td><td>192.168.1.4</td><td>http/1.1</td><td nowrap>api.example.com:443</td><td nowrap>GET /v1/items HTTP/1.1</td></tr>
</table></body></html>"#;

    fn parser() -> ScoreboardParser {
        ScoreboardParser::new().unwrap()
    }

    #[test]
    fn parses_apache_22_scoreboard() {
        let records = parser().parse(APACHE_22_PAGE).unwrap();
        assert_eq!(records.len(), 5);

        let checkout = &records[1];
        assert_eq!(checkout.server, "1-0");
        assert_eq!(checkout.pid, Some(5001202));
        assert_eq!(checkout.mode, WorkerMode::Sending);
        assert_eq!(checkout.seconds, 95);
        assert_eq!(checkout.request_ms, 12);
        assert!((checkout.cpu - 1.5).abs() < f64::EPSILON);
        assert_eq!(checkout.client, "10.0.0.7");
        assert_eq!(checkout.vhost, "shop.example.com:80");
        assert_eq!(checkout.request, "POST /checkout?a=1&b=2 HTTP/1.1");
        assert_eq!(checkout.duration_ms, None);
        assert_eq!(checkout.protocol, None);
    }

    #[test]
    fn open_slots_have_no_pid() {
        let records = parser().parse(APACHE_22_PAGE).unwrap();
        let open = records.last().unwrap();
        assert_eq!(open.pid, None);
        assert_eq!(open.mode, WorkerMode::OpenSlot);
        assert_eq!(open.request, "");
    }

    #[test]
    fn parses_apache_24_columns_and_skips_connection_table() {
        let records = parser().parse(APACHE_24_PAGE).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.pid, Some(2201));
        assert_eq!(record.mode, WorkerMode::Reading);
        assert_eq!(record.duration_ms, Some(41));
        assert_eq!(record.protocol.as_deref(), Some("http/1.1"));
        assert_eq!(record.vhost, "api.example.com:443");
    }

    #[test]
    fn page_without_scoreboard_is_an_error() {
        let page = "<html><body><h1>Apache Server Status</h1><pre>W__</pre></body></html>";
        assert_eq!(parser().parse(page), Err(ParseError::NoScoreboard));
        assert_eq!(parser().parse(""), Err(ParseError::NoScoreboard));
    }

    #[test]
    fn header_without_rows_is_empty() {
        let page = "<table><tr><th>Srv</th><th>PID</th><th>M</th><th>SS</th></tr></table>";
        assert_eq!(parser().parse(page), Ok(Vec::new()));
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let page = "<table><tr><th>PID</th><th>M</th><th>SS</th></tr>\
                    <tr><td>abc</td><td>W</td><td>1</td></tr>\
                    <tr><td>77</td><td>W</td><td>soon</td></tr>\
                    <tr><td>78</td><td>W</td><td>4</td></tr></table>";
        let records = parser().parse(page).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pid, Some(78));
        assert_eq!(records[0].seconds, 4);
    }

    #[test]
    fn decodes_common_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &amp;amp; &quot;c&quot;"), "a <b> &amp; \"c\"");
    }
}
