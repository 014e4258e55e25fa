//! TmuxPaneInfo, list-panes format string, and parser.
//!
//! The herdmux pane tags are read in the same call, so one listing per tick
//! gives identity, role and the last published state.

use chrono::{DateTime, Utc};
use herdmux_core::types::{PaneRole, PaneState, PaneTarget};
use serde::{Deserialize, Serialize};

use crate::error::TmuxError;
use crate::executor::TmuxCommandRunner;

/// Tab-delimited format string for `tmux list-panes -F`.
pub const LIST_PANES_FORMAT: &str = "#{session_name}\t#{window_index}\t#{pane_index}\t#{pane_id}\t#{window_name}\t#{window_active}\t#{pane_active}\t#{pane_current_command}\t#{pane_current_path}\t#{pane_title}\t#{pane_tty}\t#{@herd_role}\t#{@herd_name}\t#{@herd_state}\t#{@herd_since}";

const MIN_FIELDS: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmuxPaneInfo {
    pub target: PaneTarget,
    pub pane_id: String,
    pub window_name: String,
    pub window_active: bool,
    pub pane_active: bool,
    pub current_cmd: String,
    pub current_path: String,
    pub pane_title: String,
    pub pane_tty: String,
    pub role: Option<PaneRole>,
    /// `@herd_name`, empty when unset.
    pub name_tag: String,
    /// `@herd_state` as last published by a watcher.
    pub state_tag: PaneState,
    /// `@herd_since`, when present and well-formed.
    pub since_tag: Option<DateTime<Utc>>,
}

impl TmuxPaneInfo {
    /// Name shown in reports: the name tag, else the pane title, else the target.
    pub fn display_name(&self) -> String {
        if !self.name_tag.is_empty() {
            self.name_tag.clone()
        } else if !self.pane_title.is_empty() {
            self.pane_title.clone()
        } else {
            self.target.to_string()
        }
    }

    pub fn is_monitored(&self) -> bool {
        self.role.is_some()
    }

    pub fn is_conductor(&self) -> bool {
        self.role == Some(PaneRole::Conductor)
    }
}

/// Every pane on the server (`list-panes -a`), in tmux listing order.
pub fn list_panes(runner: &impl TmuxCommandRunner) -> Result<Vec<TmuxPaneInfo>, TmuxError> {
    let output = runner.run(&["list-panes", "-a", "-F", LIST_PANES_FORMAT])?;
    parse_list_panes_output(&output)
}

/// Every pane of one session (`list-panes -s`).
pub fn list_session_panes(
    runner: &impl TmuxCommandRunner,
    session: &str,
) -> Result<Vec<TmuxPaneInfo>, TmuxError> {
    let target = format!("={session}");
    let output = runner.run(&["list-panes", "-s", "-t", &target, "-F", LIST_PANES_FORMAT])?;
    parse_list_panes_output(&output)
}

pub fn parse_list_panes_output(output: &str) -> Result<Vec<TmuxPaneInfo>, TmuxError> {
    let mut panes = Vec::new();
    for (idx, line) in output.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        panes.push(parse_line(line, idx + 1)?);
    }
    Ok(panes)
}

fn parse_line(line: &str, line_num: usize) -> Result<TmuxPaneInfo, TmuxError> {
    let parse_err = |detail: String| TmuxError::ParseError {
        what: "list-panes",
        line_num,
        detail,
    };
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < MIN_FIELDS {
        return Err(parse_err(format!(
            "expected at least {MIN_FIELDS} tab-separated fields, got {}",
            parts.len()
        )));
    }

    let window = parts[1]
        .trim()
        .parse::<u32>()
        .map_err(|e| parse_err(format!("window_index {:?}: {e}", parts[1])))?;
    let pane = parts[2]
        .trim()
        .parse::<u32>()
        .map_err(|e| parse_err(format!("pane_index {:?}: {e}", parts[2])))?;
    let field = |i: usize| parts.get(i).copied().unwrap_or_default().trim().to_string();

    Ok(TmuxPaneInfo {
        target: PaneTarget::new(parts[0], window, pane),
        pane_id: parts[3].to_string(),
        window_name: parts[4].to_string(),
        window_active: parse_bool(parts[5]),
        pane_active: parse_bool(parts[6]),
        current_cmd: parts[7].to_string(),
        current_path: parts[8].to_string(),
        pane_title: parts[9].to_string(),
        pane_tty: parts[10].to_string(),
        role: PaneRole::from_tag(&field(11)),
        name_tag: field(12),
        // A hand-edited tag must not break listing.
        state_tag: field(13).parse().unwrap_or_default(),
        since_tag: DateTime::parse_from_rfc3339(&field(14))
            .ok()
            .map(|t| t.with_timezone(&Utc)),
    })
}

fn parse_bool(s: &str) -> bool {
    matches!(s.trim(), "1" | "true")
}
