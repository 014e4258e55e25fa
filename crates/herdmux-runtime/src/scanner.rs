//! One polling pass over a set of listed panes.
//!
//! Panes are processed in listing order, each at most once. Control-surface
//! failures degrade to empty readings so a vanished pane never aborts a tick.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use herdmux_core::report::{PaneReportRow, SummaryEntry, excerpt};
use herdmux_core::{PaneState, PaneTarget, PendingEntry, TransitionTracker, classify};
use herdmux_tmux::{TAG_SINCE, TAG_STATE, TmuxCommandRunner, TmuxPaneInfo, capture_pane, set_pane_tag};

use crate::alerts::Alerts;

/// A monitored pane as seen in this tick.
#[derive(Debug, Clone)]
pub struct ScannedPane {
    pub info: TmuxPaneInfo,
    pub state: PaneState,
    pub state_since: DateTime<Utc>,
    pub output: String,
}

impl ScannedPane {
    pub fn target(&self) -> &PaneTarget {
        &self.info.target
    }

    pub fn report_row(&self) -> PaneReportRow {
        PaneReportRow {
            target: self.info.target.clone(),
            name: self.info.display_name(),
            state: self.state,
            state_since: self.state_since,
            cwd: self.info.current_path.clone(),
            output: self.output.clone(),
        }
    }

    pub fn summary_entry(&self) -> SummaryEntry {
        SummaryEntry {
            target: self.info.target.clone(),
            name: self.info.display_name(),
            state: self.state,
            cwd: self.info.current_path.clone(),
            excerpt: excerpt(&self.output),
        }
    }

    pub fn pending_entry(&self, now: DateTime<Utc>) -> PendingEntry {
        PendingEntry {
            target: self.info.target.clone(),
            name: self.info.display_name(),
            state: self.state,
            cwd: self.info.current_path.clone(),
            noted_at: now,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    pub panes: Vec<ScannedPane>,
    pub idle_count: usize,
    pub total_count: usize,
    /// Some non-conductor pane is IDLE or EXITED.
    pub has_actionable: bool,
    /// Confirmed WORKING→IDLE this tick.
    pub transitioned: Vec<PaneTarget>,
    /// Non-conductor panes that moved into IDLE/EXITED this tick.
    pub newly_actionable: Vec<PaneTarget>,
    pub conductor: Option<PaneTarget>,
}

impl ScanSummary {
    pub fn pane(&self, target: &PaneTarget) -> Option<&ScannedPane> {
        self.panes.iter().find(|p| p.target() == target)
    }

    pub fn conductor_pane(&self) -> Option<&ScannedPane> {
        self.conductor.as_ref().and_then(|t| self.pane(t))
    }

    pub fn newly_actionable_panes(&self) -> impl Iterator<Item = &ScannedPane> {
        self.newly_actionable.iter().filter_map(|t| self.pane(t))
    }

    pub fn report_rows(&self) -> Vec<PaneReportRow> {
        self.panes.iter().map(ScannedPane::report_row).collect()
    }
}

/// Scan every monitored pane in `listed`, updating `tracker` and publishing
/// changed states as pane tags.
pub fn scan<R, A>(
    runner: &R,
    listed: &[TmuxPaneInfo],
    tracker: &mut TransitionTracker,
    alerts: &mut A,
    now: DateTime<Utc>,
    capture_lines: u32,
) -> ScanSummary
where
    R: TmuxCommandRunner,
    A: Alerts + ?Sized,
{
    let all_ttys: Vec<String> = listed.iter().map(|p| p.pane_tty.clone()).collect();
    alerts.protect_ttys(&all_ttys);

    let mut summary = ScanSummary::default();
    let mut live = Vec::new();
    let mut bell_sessions = BTreeSet::new();

    for info in listed.iter().filter(|p| p.is_monitored()) {
        let target = &info.target;
        live.push(target.clone());

        let output = match capture_pane(runner, target, capture_lines) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(pane = %target, "capture failed: {e}");
                String::new()
            }
        };
        let raw = classify(&info.current_cmd, &output);
        let transition = tracker.observe(target, raw, now);
        if transition.changed {
            tracing::info!(pane = %target, from = %transition.previous, to = %transition.emitted, "pane state changed");
        } else if transition.suppressed {
            tracing::debug!(pane = %target, "idle not yet confirmed");
        }

        let Some(record) = tracker.get_mut(target) else {
            continue;
        };
        if record.needs_report() {
            let since = record.state_since.to_rfc3339_opts(SecondsFormat::Secs, true);
            let published = set_pane_tag(runner, target, TAG_STATE, record.state.as_str())
                .and_then(|()| set_pane_tag(runner, target, TAG_SINCE, &since));
            match published {
                Ok(()) => record.last_reported_state = Some(record.state),
                Err(e) => tracing::warn!(pane = %target, "failed to publish state tag: {e}"),
            }
        }

        let pane = ScannedPane {
            info: info.clone(),
            state: record.state,
            state_since: record.state_since,
            output,
        };

        summary.total_count += 1;
        if pane.state == PaneState::Idle {
            summary.idle_count += 1;
        }
        if transition.is_confirmed_idle() {
            summary.transitioned.push(target.clone());
            bell_sessions.insert(target.session.clone());
        }
        if info.is_conductor() {
            if summary.conductor.is_none() {
                summary.conductor = Some(target.clone());
            }
        } else {
            summary.has_actionable |= pane.state.is_actionable();
            if transition.became_actionable() {
                summary.newly_actionable.push(target.clone());
            }
        }
        summary.panes.push(pane);
    }

    tracker.retain(&live);

    for session in &bell_sessions {
        alerts.bell(session);
    }
    summary
}

/// The single transitioned pane, if it sits in its session's active window.
pub fn auto_focus_target(summary: &ScanSummary) -> Option<&PaneTarget> {
    match summary.transitioned.as_slice() {
        [only] => summary
            .pane(only)
            .filter(|p| p.info.window_active)
            .map(ScannedPane::target),
        _ => None,
    }
}

/// Remove a trailing ` [n/m]` count added by a previous label.
pub fn strip_count_suffix(name: &str) -> &str {
    let Some(open) = name.rfind(" [") else {
        return name;
    };
    let tail = &name[open + 2..];
    let Some(inner) = tail.strip_suffix(']') else {
        return name;
    };
    match inner.split_once('/') {
        Some((a, b))
            if !a.is_empty()
                && !b.is_empty()
                && a.bytes().all(|c| c.is_ascii_digit())
                && b.bytes().all(|c| c.is_ascii_digit()) =>
        {
            &name[..open]
        }
        _ => name,
    }
}

/// `(window target, current name, desired label)` for every window holding a
/// monitored pane, in first-seen order.
pub fn window_labels(summary: &ScanSummary) -> Vec<(String, String, String)> {
    let mut windows: Vec<(String, String, usize, usize)> = Vec::new();
    for pane in &summary.panes {
        let key = pane.target().window_target();
        let idx = match windows.iter().position(|w| w.0 == key) {
            Some(idx) => idx,
            None => {
                windows.push((key, pane.info.window_name.clone(), 0, 0));
                windows.len() - 1
            }
        };
        windows[idx].3 += 1;
        if pane.state == PaneState::Idle {
            windows[idx].2 += 1;
        }
    }
    windows
        .into_iter()
        .map(|(target, current, idle, total)| {
            let label = format!("{} [{idle}/{total}]", strip_count_suffix(&current));
            (target, current, label)
        })
        .collect()
}

pub fn session_title(session: &str, idle: usize, total: usize) -> String {
    format!("herdmux {session}: {idle}/{total} idle")
}
