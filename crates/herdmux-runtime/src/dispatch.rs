//! Conductor notification: durable documents first, keystrokes last.
//!
//! Every attempt is accounted for in the action log. A deferral that repeats
//! the previous one (same reason, nothing added) is only counted, and the
//! count rides on the next PENDING or TRIGGERED record as `repeats=N`. The
//! pending file is written before any key is sent and removed only after
//! the whole instruction was submitted.

use std::io;

use chrono::{DateTime, SecondsFormat, Utc};
use herdmux_core::action_log::{ActionKind, ActionRecord};
use herdmux_core::report::{
    REPORT_TAIL_LINES, StatusReportBuilder, SummaryEntry, build_trigger_summary,
    trigger_instruction,
};
use herdmux_core::{PaneTarget, PendingBatch, PendingEntry, is_prompt_empty};
use herdmux_tmux::{
    TmuxCommandRunner, TmuxError, capture_visible, clear_input_line, send_enter, send_literal,
};

use crate::action_log::ActionLog;
use crate::config::{PROMPT_CHECK_LINES, REPORT_LOG_LINES, StatePaths};
use crate::scanner::ScanSummary;
use crate::state_files::{LastTriggerStore, PendingStore, write_atomic};

/// Whether `target`'s visible input line holds nothing but a prompt glyph.
/// Any failure to read the screen is a refusal.
pub fn prompt_line_is_empty(runner: &impl TmuxCommandRunner, target: &PaneTarget) -> bool {
    let lines = match capture_visible(runner, target) {
        Ok(lines) => lines,
        Err(e) => {
            tracing::warn!(pane = %target, "visible capture failed: {e}");
            return false;
        }
    };
    // The screen is padded with blank rows below the cursor line.
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(0, |i| i + 1);
    let start = end.saturating_sub(PROMPT_CHECK_LINES);
    is_prompt_empty(&lines[start..end])
}

/// Why a batch stayed in the pending file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    RateLimited,
    ConductorBusy,
    NoConductor,
    Paused,
    PromptNotEmpty,
    SendFailed,
}

impl DeferReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::ConductorBusy => "conductor_busy",
            Self::NoConductor => "no_conductor",
            Self::Paused => "paused",
            Self::PromptNotEmpty => "prompt_not_empty",
            Self::SendFailed => "send_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing new and nothing pending.
    Idle,
    Delivered { count: usize },
    Deferred { reason: DeferReason, pending: usize },
}

pub struct TriggerDispatcher<'a, R> {
    runner: &'a R,
    paths: &'a StatePaths,
    log: &'a ActionLog,
    pending: PendingStore,
    last_trigger: LastTriggerStore,
    /// Reason of the last logged PENDING record while a batch is parked.
    parked_reason: Option<DeferReason>,
    /// Deferrals coalesced since the last logged record.
    repeats: u32,
}

impl<'a, R: TmuxCommandRunner> TriggerDispatcher<'a, R> {
    pub fn new(runner: &'a R, paths: &'a StatePaths, log: &'a ActionLog) -> Self {
        Self {
            runner,
            paths,
            log,
            pending: PendingStore::new(paths.pending()),
            last_trigger: LastTriggerStore::new(paths.last_trigger()),
            parked_reason: None,
            repeats: 0,
        }
    }

    pub fn last_trigger_at(&self) -> DateTime<Utc> {
        self.last_trigger.load()
    }

    pub fn pending_batch(&self) -> io::Result<PendingBatch> {
        self.pending.load()
    }

    /// Park `entries` without attempting delivery.
    pub fn defer(
        &mut self,
        entries: Vec<PendingEntry>,
        reason: DeferReason,
        now: DateTime<Utc>,
    ) -> io::Result<DispatchOutcome> {
        let (batch, added) = self.pending.merge(entries)?;
        Ok(self.deferred(&batch, added, reason, now))
    }

    /// Merge `entries` with the pending batch and try to deliver all of it.
    pub fn dispatch(
        &mut self,
        conductor: &PaneTarget,
        scan: &ScanSummary,
        entries: Vec<PendingEntry>,
        now: DateTime<Utc>,
    ) -> io::Result<DispatchOutcome> {
        let (batch, added) = self.pending.merge(entries)?;
        if batch.is_empty() {
            self.parked_reason = None;
            return Ok(DispatchOutcome::Idle);
        }
        self.write_documents(scan, &batch, now)?;

        if !prompt_line_is_empty(self.runner, conductor) {
            return Ok(self.deferred(&batch, added, DeferReason::PromptNotEmpty, now));
        }

        let instruction = trigger_instruction(
            batch.len(),
            &self.paths.trigger_summary().display().to_string(),
            &self.paths.status_report().display().to_string(),
        );
        if let Err(e) = self.inject(conductor, &instruction) {
            tracing::warn!(%conductor, "injection failed: {e}");
            return Ok(self.deferred(&batch, added, DeferReason::SendFailed, now));
        }

        self.pending.clear()?;
        self.last_trigger.record(now)?;
        let targets: Vec<String> = batch.entries().iter().map(|e| e.target.to_string()).collect();
        tracing::info!(%conductor, count = batch.len(), "conductor triggered");
        let record = ActionRecord::new(ActionKind::Triggered, now)
            .field("conductor", conductor)
            .field("count", batch.len())
            .field("targets", targets.join(","));
        self.record_with_repeats(record);
        self.parked_reason = None;
        Ok(DispatchOutcome::Delivered { count: batch.len() })
    }

    /// Log a PENDING record unless it would repeat the previous one.
    fn deferred(
        &mut self,
        batch: &PendingBatch,
        added: usize,
        reason: DeferReason,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        if batch.is_empty() {
            self.parked_reason = None;
        } else if added > 0 || self.parked_reason != Some(reason) {
            tracing::info!(reason = reason.as_str(), added, count = batch.len(), "delivery deferred");
            let record = ActionRecord::new(ActionKind::Pending, now)
                .field("reason", reason.as_str())
                .field("added", added)
                .field("count", batch.len());
            self.record_with_repeats(record);
            self.parked_reason = Some(reason);
        } else {
            tracing::debug!(reason = reason.as_str(), count = batch.len(), "delivery still deferred");
            self.repeats += 1;
        }
        DispatchOutcome::Deferred {
            reason,
            pending: batch.len(),
        }
    }

    fn record_with_repeats(&mut self, mut record: ActionRecord) {
        if self.repeats > 0 {
            record = record.field("repeats", self.repeats);
            self.repeats = 0;
        }
        self.log.record(&record);
    }

    fn inject(&self, conductor: &PaneTarget, instruction: &str) -> Result<(), TmuxError> {
        clear_input_line(self.runner, conductor)?;
        send_literal(self.runner, conductor, instruction)?;
        send_enter(self.runner, conductor)
    }

    /// Rewrite the status report and the trigger summary for `batch`.
    pub fn write_documents(
        &self,
        scan: &ScanSummary,
        batch: &PendingBatch,
        now: DateTime<Utc>,
    ) -> io::Result<()> {
        let report = StatusReportBuilder::new(now)
            .tail_lines(REPORT_TAIL_LINES)
            .panes(scan.report_rows())
            .recent_actions(self.log.tail(REPORT_LOG_LINES))
            .build();
        write_atomic(&self.paths.status_report(), &report)?;

        let entries: Vec<SummaryEntry> = batch
            .entries()
            .iter()
            .map(|entry| match scan.pane(&entry.target) {
                Some(pane) => pane.summary_entry(),
                None => SummaryEntry {
                    target: entry.target.clone(),
                    name: entry.name.clone(),
                    state: entry.state,
                    cwd: entry.cwd.clone(),
                    excerpt: format!(
                        "(not seen since {})",
                        entry.noted_at.to_rfc3339_opts(SecondsFormat::Secs, true)
                    ),
                },
            })
            .collect();
        write_atomic(&self.paths.trigger_summary(), &build_trigger_summary(now, &entries))
    }
}
