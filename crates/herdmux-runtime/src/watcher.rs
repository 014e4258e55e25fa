//! Watch schedulers: a synchronous `tick()` per scope and one async loop
//! that drives any of them until the scope ends or a signal arrives.
//!
//! Both watchers own their lock for their whole life; cancellation is only
//! noticed at the top of a tick.

use std::future::Future;
use std::time::Duration;

use herdmux_core::{PaneState, PendingEntry, TransitionTracker, should_trigger};
use herdmux_tmux::{
    TmuxCommandRunner, has_session, list_panes, list_session_panes, list_sessions, rename_window,
    select_pane,
};

use crate::action_log::ActionLog;
use crate::alerts::{Alerts, SilentAlerts};
use crate::clock::Clock;
use crate::config::{StatePaths, WatchConfig};
use crate::dispatch::{DeferReason, DispatchOutcome, TriggerDispatcher};
use crate::lock::WatchLock;
use crate::scanner::{ScanSummary, auto_focus_target, scan, session_title, window_labels};
use crate::state_files::PauseFlag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The lock file was removed or now names another process.
    LockLost,
    /// The watched session (or the whole server) is gone.
    ScopeGone,
    Shutdown,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LockLost => "lock_lost",
            Self::ScopeGone => "scope_gone",
            Self::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stop(StopReason),
}

pub trait Watch {
    fn scope(&self) -> &str;
    fn tick(&mut self) -> anyhow::Result<TickOutcome>;
}

/// Tick, sleep, repeat. A failed tick is logged and retried next interval.
pub async fn run_loop<W, F>(watcher: &mut W, interval: Duration, shutdown: F) -> StopReason
where
    W: Watch + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        match watcher.tick() {
            Ok(TickOutcome::Continue) => {}
            Ok(TickOutcome::Stop(reason)) => {
                tracing::info!(scope = watcher.scope(), reason = reason.as_str(), "watch stopping");
                return reason;
            }
            Err(e) => tracing::warn!(scope = watcher.scope(), "tick failed: {e:#}"),
        }

        tokio::select! {
            () = &mut shutdown => return StopReason::Shutdown,
            () = tokio::time::sleep(interval) => {}
        }
    }
}

/// Resolves on ctrl-c or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            }
        }
        Err(e) => {
            tracing::warn!("failed to register SIGTERM handler: {e}");
            ctrl_c.await.ok();
            tracing::info!("received ctrl-c, shutting down");
        }
    }
}

/// Per-session watcher: scan, publish tags, update labels, title, bell and focus.
pub struct SessionWatcher<'a, R, C, A> {
    runner: &'a R,
    clock: C,
    alerts: A,
    session: String,
    config: WatchConfig,
    lock: WatchLock,
    tracker: TransitionTracker,
    last_summary: Option<ScanSummary>,
}

impl<'a, R, C, A> SessionWatcher<'a, R, C, A>
where
    R: TmuxCommandRunner,
    C: Clock,
    A: Alerts,
{
    pub fn new(
        runner: &'a R,
        clock: C,
        alerts: A,
        session: impl Into<String>,
        config: WatchConfig,
        lock: WatchLock,
    ) -> Self {
        Self {
            runner,
            clock,
            alerts,
            session: session.into(),
            config,
            lock,
            tracker: TransitionTracker::new(),
            last_summary: None,
        }
    }

    #[cfg(test)]
    pub fn last_summary(&self) -> Option<&ScanSummary> {
        self.last_summary.as_ref()
    }

    fn update_display(&mut self, summary: &ScanSummary) {
        for (window, current, label) in window_labels(summary) {
            if current != label {
                if let Err(e) = rename_window(self.runner, &window, &label) {
                    tracing::debug!(window, "rename-window failed: {e}");
                }
            }
        }
        let title = session_title(&self.session, summary.idle_count, summary.total_count);
        self.alerts.title(&self.session, &title);

        if let Some(target) = auto_focus_target(summary) {
            tracing::info!(pane = %target, "focusing newly idle pane");
            if let Err(e) = select_pane(self.runner, target) {
                tracing::debug!(pane = %target, "select-pane failed: {e}");
            }
        }
    }
}

impl<R, C, A> Watch for SessionWatcher<'_, R, C, A>
where
    R: TmuxCommandRunner,
    C: Clock,
    A: Alerts,
{
    fn scope(&self) -> &str {
        &self.session
    }

    fn tick(&mut self) -> anyhow::Result<TickOutcome> {
        if !self.lock.still_owned() {
            return Ok(TickOutcome::Stop(StopReason::LockLost));
        }
        if !has_session(self.runner, &self.session) {
            return Ok(TickOutcome::Stop(StopReason::ScopeGone));
        }

        let listed = list_session_panes(self.runner, &self.session)?;
        let now = self.clock.now();
        let summary = scan(
            self.runner,
            &listed,
            &mut self.tracker,
            &mut self.alerts,
            now,
            self.config.capture_lines,
        );
        let counts = (summary.idle_count, summary.total_count);
        let previous = self
            .last_summary
            .as_ref()
            .map(|s| (s.idle_count, s.total_count));
        if previous != Some(counts) {
            tracing::info!(session = %self.session, idle = counts.0, total = counts.1, "idle count changed");
        }
        self.update_display(&summary);
        self.last_summary = Some(summary);
        Ok(TickOutcome::Continue)
    }
}

/// Cross-session watcher: gate and dispatch conductor notifications.
pub struct ConductorWatcher<'a, R, C> {
    runner: &'a R,
    clock: C,
    dispatcher: TriggerDispatcher<'a, R>,
    config: WatchConfig,
    lock: WatchLock,
    pause: PauseFlag,
    tracker: TransitionTracker,
    was_paused: bool,
    last_outcome: Option<DispatchOutcome>,
}

impl<'a, R, C> ConductorWatcher<'a, R, C>
where
    R: TmuxCommandRunner,
    C: Clock,
{
    pub fn new(
        runner: &'a R,
        clock: C,
        paths: &'a StatePaths,
        log: &'a ActionLog,
        config: WatchConfig,
        lock: WatchLock,
    ) -> Self {
        Self {
            runner,
            clock,
            dispatcher: TriggerDispatcher::new(runner, paths, log),
            config,
            lock,
            pause: PauseFlag::new(paths.pause_flag()),
            tracker: TransitionTracker::new(),
            was_paused: false,
            last_outcome: None,
        }
    }

    /// What the last tick did with the batch.
    #[cfg(test)]
    pub fn last_outcome(&self) -> Option<DispatchOutcome> {
        self.last_outcome
    }

    fn evaluate(
        &mut self,
        summary: &ScanSummary,
        entries: Vec<PendingEntry>,
    ) -> anyhow::Result<DispatchOutcome> {
        let now = self.clock.now();
        let dispatcher = &mut self.dispatcher;

        let paused = self.pause.is_set();
        if paused != self.was_paused {
            tracing::info!(paused, "conductor pause flag changed");
            self.was_paused = paused;
        }
        if paused {
            return Ok(dispatcher.defer(entries, DeferReason::Paused, now)?);
        }

        let Some(conductor) = summary.conductor_pane() else {
            return Ok(dispatcher.defer(entries, DeferReason::NoConductor, now)?);
        };

        let pending = dispatcher.pending_batch()?;
        if entries.is_empty() && pending.is_empty() {
            return Ok(DispatchOutcome::Idle);
        }

        let has_actionable = summary.has_actionable || !pending.is_empty();
        if !should_trigger(
            has_actionable,
            dispatcher.last_trigger_at(),
            self.config.min_trigger_interval,
            now,
        ) {
            return Ok(dispatcher.defer(entries, DeferReason::RateLimited, now)?);
        }
        if conductor.state != PaneState::Idle {
            return Ok(dispatcher.defer(entries, DeferReason::ConductorBusy, now)?);
        }

        let target = conductor.target().clone();
        Ok(dispatcher.dispatch(&target, summary, entries, now)?)
    }
}

impl<R, C> Watch for ConductorWatcher<'_, R, C>
where
    R: TmuxCommandRunner,
    C: Clock,
{
    fn scope(&self) -> &str {
        "conductor"
    }

    fn tick(&mut self) -> anyhow::Result<TickOutcome> {
        if !self.lock.still_owned() {
            return Ok(TickOutcome::Stop(StopReason::LockLost));
        }
        match list_sessions(self.runner) {
            Ok(sessions) if !sessions.is_empty() => {}
            Ok(_) => return Ok(TickOutcome::Stop(StopReason::ScopeGone)),
            Err(e) => {
                tracing::info!("tmux server unavailable: {e}");
                return Ok(TickOutcome::Stop(StopReason::ScopeGone));
            }
        }

        let listed = list_panes(self.runner)?;
        let now = self.clock.now();
        let summary = scan(
            self.runner,
            &listed,
            &mut self.tracker,
            &mut SilentAlerts,
            now,
            self.config.capture_lines,
        );
        let entries: Vec<PendingEntry> = summary
            .newly_actionable_panes()
            .map(|p| p.pending_entry(now))
            .collect();

        let outcome = self.evaluate(&summary, entries)?;
        if self.last_outcome != Some(outcome) {
            tracing::debug!(?outcome, "conductor outcome changed");
        }
        self.last_outcome = Some(outcome);
        Ok(TickOutcome::Continue)
    }
}
