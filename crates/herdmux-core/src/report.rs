//! Status report and trigger summary rendering.
//!
//! The conductor finds information by heading text, so the `HEADING_*`
//! constants are a stable interface. Section order may change; headings may not.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::classify::is_decoration_line;
use crate::types::{PaneState, PaneTarget};

pub const HEADING_TITLE: &str = "# herdmux status";
pub const HEADING_ATTENTION: &str = "## Needs attention";
pub const HEADING_PANES: &str = "## All panes";
pub const HEADING_ACTIONS: &str = "## Recent actions";
pub const HEADING_SUMMARY: &str = "# herdmux trigger";

/// Output lines kept per pane in the attention section.
pub const REPORT_TAIL_LINES: usize = 15;

/// Case-insensitive substrings that pull a line into the "issues" list.
pub const ISSUE_KEYWORDS: &[&str] = &["error", "warning", "failed", "panic", "exception"];

const EXCERPT_MAX_CHARS: usize = 120;

/// Everything the report needs to know about one monitored pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneReportRow {
    pub target: PaneTarget,
    pub name: String,
    pub state: PaneState,
    pub state_since: DateTime<Utc>,
    pub cwd: String,
    pub output: String,
}

/// Builds the situational-awareness document read by the conductor.
#[derive(Debug, Clone)]
pub struct StatusReportBuilder {
    generated_at: DateTime<Utc>,
    tail_lines: usize,
    rows: Vec<PaneReportRow>,
    recent_actions: Vec<String>,
}

impl StatusReportBuilder {
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            tail_lines: REPORT_TAIL_LINES,
            rows: Vec::new(),
            recent_actions: Vec::new(),
        }
    }

    #[must_use]
    pub fn tail_lines(mut self, n: usize) -> Self {
        self.tail_lines = n;
        self
    }

    #[must_use]
    pub fn pane(mut self, row: PaneReportRow) -> Self {
        self.rows.push(row);
        self
    }

    #[must_use]
    pub fn panes(mut self, rows: impl IntoIterator<Item = PaneReportRow>) -> Self {
        self.rows.extend(rows);
        self
    }

    #[must_use]
    pub fn recent_actions<S: Into<String>>(mut self, lines: impl IntoIterator<Item = S>) -> Self {
        self.recent_actions = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(&self) -> String {
        let mut out = String::new();
        out.push_str(HEADING_TITLE);
        out.push_str("\n\n");
        out.push_str(&format!(
            "Generated: {}\n\n",
            self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));

        out.push_str(HEADING_ATTENTION);
        out.push_str("\n\n");
        let attention: Vec<&PaneReportRow> = self
            .rows
            .iter()
            .filter(|r| r.state != PaneState::Working)
            .collect();
        if attention.is_empty() {
            out.push_str("(none)\n\n");
        }
        for row in attention {
            self.push_attention(&mut out, row);
        }

        out.push_str(HEADING_PANES);
        out.push_str("\n\n| target | name | state |\n|---|---|---|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                row.target,
                escape_cell(&row.name),
                row.state.label()
            ));
        }
        out.push('\n');

        out.push_str(HEADING_ACTIONS);
        out.push_str("\n\n");
        if self.recent_actions.is_empty() {
            out.push_str("(none)\n");
        } else {
            out.push_str("```\n");
            for line in &self.recent_actions {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str("```\n");
        }
        out
    }

    fn push_attention(&self, out: &mut String, row: &PaneReportRow) {
        let elapsed = self
            .generated_at
            .signed_duration_since(row.state_since)
            .num_seconds();
        out.push_str(&format!("### {} {}\n\n", row.target, row.name));
        out.push_str(&format!(
            "- state: {} for {}\n",
            row.state.label(),
            format_elapsed(elapsed)
        ));
        out.push_str(&format!("- cwd: {}\n", row.cwd));

        let issues = issue_lines(&row.output);
        if !issues.is_empty() {
            out.push_str("- issues:\n");
            for line in issues {
                out.push_str(&format!("  - {}\n", line.trim()));
            }
        }

        let tail = tail_of(&row.output, self.tail_lines);
        if !tail.is_empty() {
            out.push_str("\n```\n");
            for line in tail {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str("```\n");
        }
        out.push('\n');
    }
}

/// One pane in the compact trigger summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub target: PaneTarget,
    pub name: String,
    pub state: PaneState,
    pub cwd: String,
    pub excerpt: String,
}

pub fn build_trigger_summary(generated_at: DateTime<Utc>, entries: &[SummaryEntry]) -> String {
    let mut out = format!(
        "{HEADING_SUMMARY}\n\nGenerated: {}\n\n",
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    for e in entries {
        out.push_str(&format!(
            "- {} ({}) {} in {}: {}\n",
            e.target,
            e.name,
            e.state.label(),
            e.cwd,
            e.excerpt
        ));
    }
    out
}

/// The single line typed into the conductor's prompt.
pub fn trigger_instruction(count: usize, summary_path: &str, report_path: &str) -> String {
    let noun = if count == 1 { "agent needs" } else { "agents need" };
    format!(
        "[herdmux] {count} {noun} attention. Read {summary_path} (full status: {report_path})"
    )
}

/// Last line carrying real content, cut to a one-line excerpt.
pub fn excerpt(output: &str) -> String {
    let line = output
        .lines()
        .rev()
        .find(|l| !is_decoration_line(l))
        .map(str::trim)
        .unwrap_or_default();
    truncate_chars(line, EXCERPT_MAX_CHARS)
}

pub fn issue_lines(output: &str) -> Vec<&str> {
    output
        .lines()
        .filter(|line| {
            let lower = line.to_ascii_lowercase();
            ISSUE_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .collect()
}

/// `45s`, `3m12s`, `2h05m`.
pub fn format_elapsed(seconds: i64) -> String {
    let s = seconds.max(0);
    if s < 60 {
        format!("{s}s")
    } else if s < 3600 {
        format!("{}m{:02}s", s / 60, s % 60)
    } else {
        format!("{}h{:02}m", s / 3600, (s % 3600) / 60)
    }
}

fn tail_of(output: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = output.trim_end().lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].to_vec()
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}\u{2026}")
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}
