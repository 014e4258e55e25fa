//! Crash-safe single-instance lock files.
//!
//! A lock file holds the bare pid of its owner. It is created by hard-linking
//! a fully written temp file into place, so a reader never sees a half-written
//! lock and creation is exclusive. A lock whose pid is dead is stale and may
//! be taken over once.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Owned lock. Dropping it removes the file if it still names this pid.
#[derive(Debug)]
pub struct WatchLock {
    path: PathBuf,
    pid: u32,
}

impl WatchLock {
    /// Acquire for the current process. `Ok(None)`: a live instance owns it.
    pub fn acquire(path: &Path) -> io::Result<Option<Self>> {
        Self::acquire_as(path, std::process::id())
    }

    pub fn acquire_as(path: &Path, pid: u32) -> io::Result<Option<Self>> {
        if try_create(path, pid)? {
            return Ok(Some(Self::owned(path, pid)));
        }

        match read_lock_pid(path) {
            Some(holder) if holder != pid && is_process_alive(holder) => {
                tracing::info!(path = %path.display(), holder, "lock held by live process");
                return Ok(None);
            }
            holder => {
                tracing::info!(path = %path.display(), ?holder, "removing stale lock");
                remove_if_exists(path)?;
            }
        }

        // One retry; losing this race to another taker is not an error.
        if try_create(path, pid)? {
            Ok(Some(Self::owned(path, pid)))
        } else {
            Ok(None)
        }
    }

    fn owned(path: &Path, pid: u32) -> Self {
        tracing::debug!(path = %path.display(), pid, "lock acquired");
        Self {
            path: path.to_path_buf(),
            pid,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False once the file is gone or names another pid (explicit stop or takeover).
    pub fn still_owned(&self) -> bool {
        read_lock_pid(&self.path) == Some(self.pid)
    }
}

impl Drop for WatchLock {
    fn drop(&mut self) {
        if self.still_owned() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), "failed to remove lock: {e}");
            } else {
                tracing::debug!(path = %self.path.display(), "lock released");
            }
        }
    }
}

/// `Ok(false)` when the lock file already exists.
fn try_create(path: &Path, pid: u32) -> io::Result<bool> {
    let tmp = path.with_extension(format!("{pid}.tmp"));
    {
        let mut file = std::fs::File::create(&tmp)?;
        writeln!(file, "{pid}")?;
        file.sync_all()?;
    }
    let linked = std::fs::hard_link(&tmp, path);
    let _ = std::fs::remove_file(&tmp);
    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// The pid stored in a lock file; `None` if missing, unreadable or non-numeric.
pub fn read_lock_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Check whether a process exists (signal 0). EPERM still means alive.
pub fn is_process_alive(pid: u32) -> bool {
    // pid_t is i32; larger values would wrap and address a process group.
    let Ok(raw) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    // SAFETY: kill with signal 0 performs only the existence/permission check.
    if unsafe { libc::kill(raw, 0) } == 0 {
        return true;
    }
    io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

fn send_sigterm(pid: u32) -> io::Result<()> {
    let raw = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid exceeds pid_t"))?;
    // SAFETY: plain kill(2) on a positive pid.
    if unsafe { libc::kill(raw, libc::SIGTERM) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// What an explicit stop found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    /// No lock file, or it held no usable pid.
    NothingToKill,
    /// The recorded process was already dead; nothing was signalled.
    NotRunning { pid: u32 },
    Terminated { pid: u32 },
    /// Signalled but still alive after the bounded wait.
    StillAlive { pid: u32 },
}

/// Stop whatever watcher owns `path`, then remove the lock unconditionally.
/// Never fails: unreadable or malformed content means nothing to kill.
pub fn kill_existing_watch(path: &Path, polls: u32, poll_interval: Duration) -> KillOutcome {
    let outcome = match read_lock_pid(path) {
        None => KillOutcome::NothingToKill,
        Some(pid) if pid == std::process::id() => KillOutcome::NothingToKill,
        Some(pid) if !is_process_alive(pid) => KillOutcome::NotRunning { pid },
        Some(pid) => {
            if let Err(e) = send_sigterm(pid) {
                tracing::warn!(pid, "SIGTERM failed: {e}");
            }
            let mut dead = false;
            for _ in 0..polls {
                if !is_process_alive(pid) {
                    dead = true;
                    break;
                }
                std::thread::sleep(poll_interval);
            }
            if dead || !is_process_alive(pid) {
                KillOutcome::Terminated { pid }
            } else {
                KillOutcome::StillAlive { pid }
            }
        }
    };

    if let Err(e) = remove_if_exists(path) {
        tracing::warn!(path = %path.display(), "failed to remove lock: {e}");
    }
    outcome
}
