//! Action log line format: `<RFC3339> <KIND> key=value ...`.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Triggered,
    Pending,
    Paused,
    Resumed,
    Relayed,
    RelayRefused,
    WatchStart,
    WatchStop,
    Killed,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Triggered => "TRIGGERED",
            Self::Pending => "PENDING",
            Self::Paused => "PAUSED",
            Self::Resumed => "RESUMED",
            Self::Relayed => "RELAYED",
            Self::RelayRefused => "RELAY_REFUSED",
            Self::WatchStart => "WATCH_START",
            Self::WatchStop => "WATCH_STOP",
            Self::Killed => "KILLED",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One log record, rendered as a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub at: DateTime<Utc>,
    pub kind: ActionKind,
    pub fields: Vec<(String, String)>,
}

impl ActionRecord {
    pub fn new(kind: ActionKind, at: DateTime<Utc>) -> Self {
        Self {
            at,
            kind,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    /// Render without a trailing newline. Values with spaces are quoted.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{} {}",
            self.at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.kind
        );
        for (key, value) in &self.fields {
            let value = value.replace(['\n', '\r'], " ");
            if value.is_empty() || value.contains(' ') {
                line.push_str(&format!(" {key}=\"{}\"", value.replace('"', "'")));
            } else {
                line.push_str(&format!(" {key}={value}"));
            }
        }
        line
    }
}

/// Last `n` non-empty lines of log text, oldest first.
pub fn tail_lines(text: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-19T12:00:00Z")
            .expect("valid")
            .with_timezone(&Utc)
    }

    #[test]
    fn line_format() {
        let line = ActionRecord::new(ActionKind::Triggered, ts())
            .field("panes", 2)
            .field("targets", "a:0.1,a:0.2")
            .to_line();
        assert_eq!(
            line,
            "2026-10-19T12:00:00Z TRIGGERED panes=2 targets=a:0.1,a:0.2"
        );
    }

    #[test]
    fn values_with_spaces_are_quoted() {
        let line = ActionRecord::new(ActionKind::Pending, ts())
            .field("reason", "prompt not empty")
            .field("note", "")
            .to_line();
        assert!(line.ends_with("reason=\"prompt not empty\" note=\"\""));
    }

    #[test]
    fn newlines_never_split_a_record() {
        let line = ActionRecord::new(ActionKind::Relayed, ts())
            .field("text", "a\nb")
            .to_line();
        assert_eq!(line.lines().count(), 1);
    }

    #[test]
    fn tail_keeps_order_and_bound() {
        let text = "one\ntwo\n\nthree\nfour\n";
        assert_eq!(tail_lines(text, 2), vec!["three", "four"]);
        assert_eq!(tail_lines(text, 10).len(), 4);
        assert!(tail_lines("", 5).is_empty());
    }
}
