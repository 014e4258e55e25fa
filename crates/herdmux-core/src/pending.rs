//! Pending trigger batch: agents awaiting a safe delivery to the conductor.
//!
//! Serialized as one tab-separated line per pane:
//! `target<TAB>state<TAB>noted_at<TAB>name<TAB>cwd`.

use chrono::{DateTime, Utc};

use crate::types::{HerdError, PaneState, PaneTarget};

/// One agent that needs the conductor's attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub target: PaneTarget,
    pub name: String,
    pub state: PaneState,
    pub cwd: String,
    pub noted_at: DateTime<Utc>,
}

impl PendingEntry {
    fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.target,
            self.state.label(),
            self.noted_at.to_rfc3339(),
            sanitize(&self.name),
            sanitize(&self.cwd),
        )
    }

    fn parse_line(line: &str, line_num: usize) -> Result<Self, HerdError> {
        let bad = |detail: String| HerdError::InvalidPendingLine { line_num, detail };
        let parts: Vec<&str> = line.splitn(5, '\t').collect();
        if parts.len() < 3 {
            return Err(bad(format!(
                "expected at least 3 tab-separated fields, got {}",
                parts.len()
            )));
        }
        let target: PaneTarget = parts[0].parse().map_err(|e| bad(format!("{e}")))?;
        let state: PaneState = parts[1].parse().map_err(|e| bad(format!("{e}")))?;
        let noted_at = DateTime::parse_from_rfc3339(parts[2])
            .map_err(|e| bad(format!("bad timestamp: {e}")))?
            .with_timezone(&Utc);
        Ok(Self {
            target,
            state,
            noted_at,
            name: parts.get(3).copied().unwrap_or_default().to_string(),
            cwd: parts.get(4).copied().unwrap_or_default().to_string(),
        })
    }
}

fn sanitize(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

/// The single pending batch. Entries are unique by target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingBatch {
    entries: Vec<PendingEntry>,
}

impl PendingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse file contents. Malformed lines are skipped and reported.
    pub fn parse(text: &str) -> (Self, Vec<HerdError>) {
        let mut batch = Self::new();
        let mut errors = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match PendingEntry::parse_line(line, idx + 1) {
                Ok(entry) => {
                    batch.merge(std::iter::once(entry));
                }
                Err(e) => errors.push(e),
            }
        }
        (batch, errors)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_line());
            out.push('\n');
        }
        out
    }

    /// Add entries whose target is not already listed. Returns how many were added.
    pub fn merge(&mut self, entries: impl IntoIterator<Item = PendingEntry>) -> usize {
        let mut added = 0;
        for entry in entries {
            if !self.contains(&entry.target) {
                self.entries.push(entry);
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, target: &PaneTarget) -> bool {
        self.entries.iter().any(|e| &e.target == target)
    }

    pub fn entries(&self) -> &[PendingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-19T12:00:00Z")
            .expect("valid")
            .with_timezone(&Utc)
    }

    fn entry(pane: u32, state: PaneState) -> PendingEntry {
        PendingEntry {
            target: PaneTarget::new("agents", 0, pane),
            name: format!("agent-{pane}"),
            state,
            cwd: "/work/repo".into(),
            noted_at: ts(),
        }
    }

    #[test]
    fn merge_skips_listed_targets() {
        let mut batch = PendingBatch::new();
        assert_eq!(batch.merge([entry(1, PaneState::Idle)]), 1);
        assert_eq!(
            batch.merge([entry(1, PaneState::Exited), entry(2, PaneState::Exited)]),
            1
        );
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.entries()[0].state, PaneState::Idle, "first report kept");
    }

    #[test]
    fn render_then_parse_keeps_entries() {
        let mut batch = PendingBatch::new();
        batch.merge([entry(1, PaneState::Idle), entry(3, PaneState::Exited)]);
        let (parsed, errors) = PendingBatch::parse(&batch.render());
        assert!(errors.is_empty());
        assert_eq!(parsed, batch);
    }

    #[test]
    fn name_with_tab_is_flattened() {
        let mut e = entry(1, PaneState::Idle);
        e.name = "odd\tname".into();
        let line = e.to_line();
        assert_eq!(line.matches('\t').count(), 4);
        assert!(line.contains("odd name"));
    }

    #[test]
    fn malformed_lines_are_reported_not_fatal() {
        let text = "agents:0.1\tIDLE\t2026-10-19T12:00:00+00:00\ta\t/w\n\
                    garbage\n\
                    agents:0.2\tNAPPING\t2026-10-19T12:00:00+00:00\n";
        let (batch, errors) = PendingBatch::parse(text);
        assert_eq!(batch.len(), 1);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn parse_tolerates_missing_optional_fields() {
        let (batch, errors) = PendingBatch::parse("agents:0.4\tEXITED\t2026-10-19T12:00:00Z\n");
        assert!(errors.is_empty());
        assert_eq!(batch.entries()[0].name, "");
        assert_eq!(batch.entries()[0].cwd, "");
    }
}
