//! Runtime configuration: tunable defaults and on-disk state paths.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;

/// Per-session watch cadence.
pub const WATCH_INTERVAL_SECS: u64 = 2;
/// Lines of scrollback captured per pane per tick.
pub const CAPTURE_LINES: u32 = 40;
/// Visible conductor lines inspected by the empty-prompt check.
pub const PROMPT_CHECK_LINES: usize = 8;
/// Action log lines carried into the status report.
pub const REPORT_LOG_LINES: usize = 20;
/// Post-SIGTERM liveness polls before giving up on a watcher.
pub const KILL_WAIT_POLLS: u32 = 20;
pub const KILL_WAIT_INTERVAL_MS: u64 = 100;

pub const ENV_STATE_DIR: &str = "HERDMUX_STATE_DIR";

/// Tunables shared by both watcher kinds.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub interval: Duration,
    pub min_trigger_interval: TimeDelta,
    pub capture_lines: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(WATCH_INTERVAL_SECS),
            min_trigger_interval: TimeDelta::seconds(herdmux_core::TRIGGER_MIN_INTERVAL_SECS),
            capture_lines: CAPTURE_LINES,
        }
    }
}

/// Every file herdmux keeps, rooted at one state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub dir: PathBuf,
}

impl StatePaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `--state-dir` (or `HERDMUX_STATE_DIR`, via clap) > `$XDG_RUNTIME_DIR/herdmux` > `/tmp/herdmux-$USER`.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        if let Some(dir) = explicit {
            return Self::new(dir);
        }
        if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
            return Self::new(PathBuf::from(dir).join("herdmux"));
        }
        let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
        Self::new(format!("/tmp/herdmux-{user}"))
    }

    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    pub fn session_lock(&self, session: &str) -> PathBuf {
        self.dir
            .join(format!("watch-{}.lock", sanitize_file_component(session)))
    }

    pub fn conductor_lock(&self) -> PathBuf {
        self.dir.join("conductor.lock")
    }

    pub fn pending(&self) -> PathBuf {
        self.dir.join("trigger-pending.txt")
    }

    pub fn last_trigger(&self) -> PathBuf {
        self.dir.join("last-trigger")
    }

    pub fn pause_flag(&self) -> PathBuf {
        self.dir.join("paused")
    }

    pub fn action_log(&self) -> PathBuf {
        self.dir.join("actions.log")
    }

    pub fn status_report(&self) -> PathBuf {
        self.dir.join("status.md")
    }

    pub fn trigger_summary(&self) -> PathBuf {
        self.dir.join("trigger-summary.md")
    }
}

/// Session names may hold `/` or spaces; keep lock names flat. Bytes outside
/// `[A-Za-z0-9._-]` become `%XX`, so distinct names never share a file.
fn sanitize_file_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.') {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let paths = StatePaths::resolve(Some(Path::new("/var/herd")));
        assert_eq!(paths.dir, PathBuf::from("/var/herd"));
        assert_eq!(paths.pending(), PathBuf::from("/var/herd/trigger-pending.txt"));
        assert_eq!(paths.conductor_lock(), PathBuf::from("/var/herd/conductor.lock"));
    }

    #[test]
    fn session_lock_is_flat() {
        let paths = StatePaths::new("/s");
        assert_eq!(
            paths.session_lock("team/a b"),
            PathBuf::from("/s/watch-team%2Fa%20b.lock")
        );
        assert_eq!(paths.session_lock("agents"), PathBuf::from("/s/watch-agents.lock"));
    }

    #[test]
    fn distinct_sessions_get_distinct_locks() {
        let paths = StatePaths::new("/s");
        assert_ne!(paths.session_lock("a/b"), paths.session_lock("a_b"));
        assert_ne!(paths.session_lock("a%2Fb"), paths.session_lock("a/b"));
        assert_eq!(paths.session_lock("a_b"), PathBuf::from("/s/watch-a_b.lock"));
        assert_eq!(paths.session_lock("\u{e9}"), PathBuf::from("/s/watch-%C3%A9.lock"));
    }

    #[test]
    fn defaults_match_constants() {
        let config = WatchConfig::default();
        assert_eq!(config.interval, Duration::from_secs(2));
        assert_eq!(config.min_trigger_interval, TimeDelta::seconds(30));
        assert_eq!(config.capture_lines, 40);
    }
}
