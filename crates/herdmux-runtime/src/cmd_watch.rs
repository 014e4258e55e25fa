//! `herdmux watch`, `herdmux conductor`, `herdmux stop`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use herdmux_core::action_log::{ActionKind, ActionRecord};
use herdmux_tmux::{TmuxCommandRunner, has_session};

use crate::action_log::ActionLog;
use crate::alerts::ClientTtyAlerts;
use crate::clock::SystemClock;
use crate::config::{KILL_WAIT_INTERVAL_MS, KILL_WAIT_POLLS, StatePaths, WatchConfig};
use crate::lock::{KillOutcome, WatchLock, kill_existing_watch};
use crate::watcher::{ConductorWatcher, SessionWatcher, run_loop, shutdown_signal};

pub const CONDUCTOR_SCOPE: &str = "conductor";

/// Watch one session until it disappears, the lock is taken, or a signal arrives.
pub async fn cmd_watch(
    runner: &impl TmuxCommandRunner,
    paths: &StatePaths,
    session: &str,
    config: WatchConfig,
) -> anyhow::Result<()> {
    if !has_session(runner, session) {
        anyhow::bail!("tmux session {session:?} not found");
    }
    paths.ensure_dir()?;
    let Some(lock) = WatchLock::acquire(&paths.session_lock(session))? else {
        tracing::info!(session, "another watcher owns this session; exiting");
        return Ok(());
    };

    let log = ActionLog::new(paths.action_log());
    log_watch(&log, ActionKind::WatchStart, session, None, Utc::now());
    tracing::info!(session, lock = %lock.path().display(), interval = ?config.interval, "session watch started");

    let interval = config.interval;
    let mut watcher = SessionWatcher::new(
        runner,
        SystemClock,
        ClientTtyAlerts::new(runner),
        session,
        config,
        lock,
    );
    let reason = run_loop(&mut watcher, interval, shutdown_signal()).await;
    drop(watcher);

    log_watch(&log, ActionKind::WatchStop, session, Some(reason.as_str()), Utc::now());
    Ok(())
}

/// Cross-session conductor watcher.
pub async fn cmd_conductor(
    runner: &impl TmuxCommandRunner,
    paths: &StatePaths,
    config: WatchConfig,
) -> anyhow::Result<()> {
    paths.ensure_dir()?;
    let Some(lock) = WatchLock::acquire(&paths.conductor_lock())? else {
        tracing::info!("another conductor watcher is running; exiting");
        return Ok(());
    };

    let log = ActionLog::new(paths.action_log());
    log_watch(&log, ActionKind::WatchStart, CONDUCTOR_SCOPE, None, Utc::now());
    tracing::info!(
        lock = %lock.path().display(),
        interval = ?config.interval,
        min_trigger = config.min_trigger_interval.num_seconds(),
        "conductor watch started"
    );

    let interval = config.interval;
    let mut watcher = ConductorWatcher::new(runner, SystemClock, paths, &log, config, lock);
    let reason = run_loop(&mut watcher, interval, shutdown_signal()).await;
    drop(watcher);

    log_watch(
        &log,
        ActionKind::WatchStop,
        CONDUCTOR_SCOPE,
        Some(reason.as_str()),
        Utc::now(),
    );
    Ok(())
}

fn log_watch(
    log: &ActionLog,
    kind: ActionKind,
    scope: &str,
    reason: Option<&str>,
    now: DateTime<Utc>,
) {
    let mut record = ActionRecord::new(kind, now)
        .field("scope", scope)
        .field("pid", std::process::id());
    if let Some(reason) = reason {
        record = record.field("reason", reason);
    }
    log.record(&record);
}

/// Stop the watcher for `session`, or the conductor watcher when `None`.
pub fn cmd_stop(paths: &StatePaths, session: Option<&str>) -> anyhow::Result<KillOutcome> {
    let (scope, lock_path) = match session {
        Some(session) => (session, paths.session_lock(session)),
        None => (CONDUCTOR_SCOPE, paths.conductor_lock()),
    };
    let outcome = kill_existing_watch(
        &lock_path,
        KILL_WAIT_POLLS,
        Duration::from_millis(KILL_WAIT_INTERVAL_MS),
    );

    let log = ActionLog::new(paths.action_log());
    let now = Utc::now();
    match outcome {
        KillOutcome::NothingToKill => println!("no {scope} watcher running"),
        KillOutcome::NotRunning { pid } => {
            println!("{scope} watcher (pid {pid}) was not running; lock removed");
        }
        KillOutcome::Terminated { pid } => {
            println!("stopped {scope} watcher (pid {pid})");
            log.record(
                &ActionRecord::new(ActionKind::Killed, now)
                    .field("scope", scope)
                    .field("pid", pid),
            );
        }
        KillOutcome::StillAlive { pid } => {
            log.record(
                &ActionRecord::new(ActionKind::Killed, now)
                    .field("scope", scope)
                    .field("pid", pid)
                    .field("result", "still_alive"),
            );
            anyhow::bail!("{scope} watcher (pid {pid}) did not exit after SIGTERM");
        }
    }
    Ok(outcome)
}
