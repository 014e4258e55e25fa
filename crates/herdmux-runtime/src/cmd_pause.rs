//! `herdmux pause` / `herdmux resume`: toggle conductor delivery.

use chrono::{DateTime, Utc};
use herdmux_core::action_log::{ActionKind, ActionRecord};

use crate::action_log::ActionLog;
use crate::config::StatePaths;
use crate::state_files::PauseFlag;

/// Returns whether the flag changed.
pub fn cmd_pause(paths: &StatePaths, now: DateTime<Utc>) -> anyhow::Result<bool> {
    paths.ensure_dir()?;
    let changed = PauseFlag::new(paths.pause_flag()).set(now)?;
    if changed {
        ActionLog::new(paths.action_log()).record(&ActionRecord::new(ActionKind::Paused, now));
        println!("conductor triggers paused; actionable panes will queue");
    } else {
        println!("already paused");
    }
    Ok(changed)
}

pub fn cmd_resume(paths: &StatePaths, now: DateTime<Utc>) -> anyhow::Result<bool> {
    let changed = PauseFlag::new(paths.pause_flag()).clear()?;
    if changed {
        ActionLog::new(paths.action_log()).record(&ActionRecord::new(ActionKind::Resumed, now));
        println!("conductor triggers resumed");
    } else {
        println!("not paused");
    }
    Ok(changed)
}
