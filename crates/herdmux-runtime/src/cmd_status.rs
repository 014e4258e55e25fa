//! `herdmux status` and `herdmux report`: one-shot views of every monitored pane.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use herdmux_core::report::{PaneReportRow, REPORT_TAIL_LINES, StatusReportBuilder};
use herdmux_core::{PaneRole, PaneState, PaneTarget, classify};
use herdmux_tmux::{TmuxCommandRunner, list_panes};
use serde::{Serialize, Serializer};

use crate::action_log::ActionLog;
use crate::config::{CAPTURE_LINES, REPORT_LOG_LINES, StatePaths};
use crate::state_files::write_atomic;

/// One monitored pane, as reported by `status --json`.
#[derive(Debug, Clone, Serialize)]
pub struct PaneStatus {
    #[serde(serialize_with = "serialize_display")]
    pub target: PaneTarget,
    pub name: String,
    pub role: PaneRole,
    pub state: PaneState,
    pub since: Option<DateTime<Utc>>,
    pub command: String,
    pub cwd: String,
    #[serde(skip)]
    pub output: String,
}

fn serialize_display<S: Serializer>(target: &PaneTarget, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(target)
}

/// Prefer the state a watcher published (it is hysteresis-smoothed); fall
/// back to classifying the screen when no watcher has tagged the pane.
pub fn collect(runner: &impl TmuxCommandRunner) -> anyhow::Result<Vec<PaneStatus>> {
    let mut out = Vec::new();
    for info in list_panes(runner)? {
        let Some(role) = info.role else { continue };
        let output = match herdmux_tmux::capture_pane(runner, &info.target, CAPTURE_LINES) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(pane = %info.target, "capture failed: {e}");
                String::new()
            }
        };
        let (state, since) = match info.state_tag {
            PaneState::Unknown => (classify(&info.current_cmd, &output), None),
            published => (published, info.since_tag),
        };
        out.push(PaneStatus {
            target: info.target.clone(),
            name: info.display_name(),
            role,
            state,
            since,
            command: info.current_cmd.clone(),
            cwd: info.current_path.clone(),
            output,
        });
    }
    Ok(out)
}

fn state_glyph(state: PaneState) -> char {
    match state {
        PaneState::Idle => '○',
        PaneState::Working => '●',
        PaneState::Exited => '✖',
        PaneState::Unknown => '?',
    }
}

/// `○api ●web ✖db`, agents only, in listing order.
pub fn format_status_line(panes: &[PaneStatus]) -> String {
    let parts: Vec<String> = panes
        .iter()
        .filter(|p| p.role == PaneRole::Agent)
        .map(|p| format!("{}{}", state_glyph(p.state), p.name))
        .collect();
    if parts.is_empty() {
        "no monitored panes".to_string()
    } else {
        parts.join(" ")
    }
}

pub fn cmd_status(runner: &impl TmuxCommandRunner, json: bool) -> anyhow::Result<()> {
    let panes = collect(runner)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&panes)?);
    } else {
        println!("{}", format_status_line(&panes));
    }
    Ok(())
}

pub fn build_report(panes: &[PaneStatus], log: &ActionLog, now: DateTime<Utc>) -> String {
    let rows = panes.iter().map(|p| PaneReportRow {
        target: p.target.clone(),
        name: p.name.clone(),
        state: p.state,
        state_since: p.since.unwrap_or(now),
        cwd: p.cwd.clone(),
        output: p.output.clone(),
    });
    StatusReportBuilder::new(now)
        .tail_lines(REPORT_TAIL_LINES)
        .panes(rows)
        .recent_actions(log.tail(REPORT_LOG_LINES))
        .build()
}

/// Write the status report and return its path.
pub fn cmd_report(
    runner: &impl TmuxCommandRunner,
    paths: &StatePaths,
    now: DateTime<Utc>,
) -> anyhow::Result<PathBuf> {
    paths.ensure_dir()?;
    let panes = collect(runner)?;
    let report = build_report(&panes, &ActionLog::new(paths.action_log()), now);
    let path = paths.status_report();
    write_atomic(&path, &report)?;
    println!("{}", path.display());
    Ok(path)
}
