// Parsing of the mirroring tool's progress output

use once_cell::sync::Lazy;
use regex::Regex;

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("valid percent regex"));

static SPEED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Speed:\s*([\d,.]+\s*[KMG]?B/sec)").expect("valid speed regex"));

/// Splits a byte stream into lines on `\r` or `\n`.
///
/// The tool rewrites its progress line in place with carriage returns, so
/// both separators end a line. Incomplete trailing data is held until more
/// bytes arrive or [`finish`](Self::finish) is called.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning the non-empty lines they complete
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            if b == b'\r' || b == b'\n' {
                self.take_line(&mut lines);
            } else {
                self.pending.push(b);
            }
        }
        lines
    }

    /// Flush whatever is left once the stream has ended
    pub fn finish(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        self.take_line(&mut lines);
        lines
    }

    fn take_line(&mut self, lines: &mut Vec<String>) {
        if self.pending.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        if !line.is_empty() {
            lines.push(line);
        }
    }
}

/// Completion percentage reported on a line, clamped to 0-100
pub fn parse_percent(line: &str) -> Option<f64> {
    let caps = PERCENT_RE.captures(line)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(value.clamp(0.0, 100.0))
}

/// Transfer speed reported on a line, e.g. `12.5 MB/sec`
pub fn parse_speed(line: &str) -> Option<String> {
    SPEED_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}
