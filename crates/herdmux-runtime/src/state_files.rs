//! Durable conductor state: pending batch, last-trigger time, pause flag.
//!
//! Only the lock-holding conductor watcher writes the first two; the pause
//! flag may be toggled by any process.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use herdmux_core::{PendingBatch, PendingEntry};

/// Write via a sibling temp file and rename, so readers never see a torn file.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}

fn remove_quietly(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// The file-backed [`PendingBatch`].
#[derive(Debug, Clone)]
pub struct PendingStore {
    path: PathBuf,
}

impl PendingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Missing file is an empty batch. Malformed lines are dropped with a warning.
    pub fn load(&self) -> io::Result<PendingBatch> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PendingBatch::new()),
            Err(e) => return Err(e),
        };
        let (batch, errors) = PendingBatch::parse(&text);
        for error in errors {
            tracing::warn!(path = %self.path.display(), "skipping pending line: {error}");
        }
        Ok(batch)
    }

    /// Merge `entries` into the stored batch; returns the merged batch and
    /// how many entries were new. The file is rewritten only when something
    /// was added.
    pub fn merge(
        &self,
        entries: impl IntoIterator<Item = PendingEntry>,
    ) -> io::Result<(PendingBatch, usize)> {
        let mut batch = self.load()?;
        let added = batch.merge(entries);
        if added > 0 {
            write_atomic(&self.path, &batch.render())?;
        }
        Ok((batch, added))
    }

    /// Only called after a successful delivery.
    pub fn clear(&self) -> io::Result<()> {
        remove_quietly(&self.path)
    }
}

/// `last_trigger_at`, persisted so a restarted watcher keeps the rate limit.
#[derive(Debug, Clone)]
pub struct LastTriggerStore {
    path: PathBuf,
}

impl LastTriggerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Missing or unreadable means "never triggered".
    pub fn load(&self) -> DateTime<Utc> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Store `now`, never moving the stored time backwards.
    pub fn record(&self, now: DateTime<Utc>) -> io::Result<DateTime<Utc>> {
        let at = self.load().max(now);
        write_atomic(
            &self.path,
            &format!("{}\n", at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        )?;
        Ok(at)
    }
}

/// Presence of the flag file means paused.
#[derive(Debug, Clone)]
pub struct PauseFlag {
    path: PathBuf,
}

impl PauseFlag {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn is_set(&self) -> bool {
        self.path.exists()
    }

    /// Returns false if it was already set.
    pub fn set(&self, now: DateTime<Utc>) -> io::Result<bool> {
        if self.is_set() {
            return Ok(false);
        }
        std::fs::write(
            &self.path,
            format!("{}\n", now.to_rfc3339_opts(SecondsFormat::Secs, true)),
        )?;
        Ok(true)
    }

    /// Returns false if it was not set.
    pub fn clear(&self) -> io::Result<bool> {
        if !self.is_set() {
            return Ok(false);
        }
        remove_quietly(&self.path)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use herdmux_core::{PaneState, PaneTarget};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("valid")
            .with_timezone(&Utc)
    }

    fn entry(pane: u32) -> PendingEntry {
        PendingEntry {
            target: PaneTarget::new("agents", 0, pane),
            name: format!("agent-{pane}"),
            state: PaneState::Idle,
            cwd: "/work".to_string(),
            noted_at: at("2026-10-19T12:00:00Z"),
        }
    }

    #[test]
    fn pending_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trigger-pending.txt");
        let store = PendingStore::new(&path);
        assert!(store.load().expect("load").is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn pending_merge_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PendingStore::new(dir.path().join("trigger-pending.txt"));

        let (batch, added) = store.merge([entry(1), entry(2)]).expect("merge");
        assert_eq!((batch.len(), added), (2, 2));

        let (batch, added) = store.merge([entry(2), entry(3)]).expect("merge");
        assert_eq!((batch.len(), added), (3, 1));

        let reloaded = store.load().expect("load");
        assert_eq!(reloaded, batch);
    }

    #[test]
    fn pending_merge_of_nothing_creates_no_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trigger-pending.txt");
        let store = PendingStore::new(&path);
        let (_, added) = store.merge(Vec::new()).expect("merge");
        assert_eq!(added, 0);
        assert!(!path.exists());
    }

    #[test]
    fn pending_skips_malformed_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trigger-pending.txt");
        std::fs::write(
            &path,
            "garbage\nagents:0.4\tIDLE\t2026-10-19T12:00:00+00:00\tapi\t/w\n",
        )
        .expect("write");
        let batch = PendingStore::new(&path).load().expect("load");
        assert_eq!(batch.len(), 1);
        assert!(batch.contains(&PaneTarget::new("agents", 0, 4)));
    }

    #[test]
    fn pending_clear_tolerates_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trigger-pending.txt");
        let store = PendingStore::new(&path);
        store.clear().expect("clear missing");
        store.merge([entry(1)]).expect("merge");
        assert!(path.exists());
        store.clear().expect("clear");
        assert!(!path.exists());
    }

    #[test]
    fn last_trigger_defaults_to_epoch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LastTriggerStore::new(dir.path().join("last-trigger"));
        assert_eq!(store.load(), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn last_trigger_is_monotone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LastTriggerStore::new(dir.path().join("last-trigger"));
        let t1 = at("2026-10-19T12:00:00Z");
        assert_eq!(store.record(t1).expect("record"), t1);
        assert_eq!(store.load(), t1);

        let earlier = t1 - TimeDelta::seconds(90);
        assert_eq!(store.record(earlier).expect("record"), t1);
        assert_eq!(store.load(), t1);
    }

    #[test]
    fn pause_flag_toggles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let flag = PauseFlag::new(dir.path().join("paused"));
        let now = at("2026-10-19T12:00:00Z");
        assert!(!flag.is_set());
        assert!(flag.set(now).expect("set"));
        assert!(!flag.set(now).expect("set again"));
        assert!(flag.is_set());
        assert!(flag.clear().expect("clear"));
        assert!(!flag.clear().expect("clear again"));
    }
}
