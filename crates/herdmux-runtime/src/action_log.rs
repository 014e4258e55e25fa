//! Append-only audit log of conductor-facing actions.

use std::io::{self, Write};
use std::path::PathBuf;

use herdmux_core::action_log::{ActionRecord, tail_lines};

#[derive(Debug, Clone)]
pub struct ActionLog {
    path: PathBuf,
}

impl ActionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, record: &ActionRecord) -> io::Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", record.to_line())
    }

    /// Append, logging instead of failing. The audit trail must not stop a tick.
    pub fn record(&self, record: &ActionRecord) {
        if let Err(e) = self.append(record) {
            tracing::warn!(path = %self.path.display(), kind = %record.kind, "action log write failed: {e}");
        }
    }

    /// Last `n` entries, oldest first. Missing log is empty.
    pub fn tail(&self, n: usize) -> Vec<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => tail_lines(&text, n).into_iter().map(String::from).collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use herdmux_core::action_log::ActionKind;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("valid")
            .with_timezone(&Utc)
    }

    #[test]
    fn append_then_tail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = ActionLog::new(dir.path().join("actions.log"));
        assert!(log.tail(5).is_empty());

        log.append(&ActionRecord::new(ActionKind::Paused, ts("2026-10-19T12:00:00Z")))
            .expect("append");
        log.append(
            &ActionRecord::new(ActionKind::Triggered, ts("2026-10-19T12:00:05Z")).field("count", 2),
        )
        .expect("append");
        log.record(&ActionRecord::new(ActionKind::Resumed, ts("2026-10-19T12:00:09Z")));

        let tail = log.tail(2);
        assert_eq!(
            tail,
            vec![
                "2026-10-19T12:00:05Z TRIGGERED count=2".to_string(),
                "2026-10-19T12:00:09Z RESUMED".to_string(),
            ]
        );
    }
}
