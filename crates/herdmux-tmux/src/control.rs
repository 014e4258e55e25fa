//! Writes to the multiplexer: pane tags, synthetic keys, focus, window labels.

use herdmux_core::types::PaneTarget;

use crate::error::TmuxError;
use crate::executor::TmuxCommandRunner;

/// `agent` | `conductor`; untagged panes are ignored.
pub const TAG_ROLE: &str = "@herd_role";
/// Display name of the agent.
pub const TAG_NAME: &str = "@herd_name";
/// Last published [`herdmux_core::PaneState`].
pub const TAG_STATE: &str = "@herd_state";
/// RFC 3339 time the published state began.
pub const TAG_SINCE: &str = "@herd_since";

/// Set a pane-scoped user option.
pub fn set_pane_tag(
    runner: &impl TmuxCommandRunner,
    target: &PaneTarget,
    key: &str,
    value: &str,
) -> Result<(), TmuxError> {
    let target = target.to_string();
    runner.run(&["set-option", "-p", "-t", &target, key, value])?;
    Ok(())
}

/// Wipe whatever is on the pane's input line (readline `C-u`).
pub fn clear_input_line(
    runner: &impl TmuxCommandRunner,
    target: &PaneTarget,
) -> Result<(), TmuxError> {
    let target = target.to_string();
    runner.run(&["send-keys", "-t", &target, "C-u"])?;
    Ok(())
}

/// Type `text` literally; no key-name interpretation.
pub fn send_literal(
    runner: &impl TmuxCommandRunner,
    target: &PaneTarget,
    text: &str,
) -> Result<(), TmuxError> {
    let target = target.to_string();
    runner.run(&["send-keys", "-t", &target, "-l", text])?;
    Ok(())
}

pub fn send_enter(runner: &impl TmuxCommandRunner, target: &PaneTarget) -> Result<(), TmuxError> {
    let target = target.to_string();
    runner.run(&["send-keys", "-t", &target, "Enter"])?;
    Ok(())
}

pub fn select_pane(runner: &impl TmuxCommandRunner, target: &PaneTarget) -> Result<(), TmuxError> {
    let target = target.to_string();
    runner.run(&["select-pane", "-t", &target])?;
    Ok(())
}

pub fn rename_window(
    runner: &impl TmuxCommandRunner,
    window_target: &str,
    name: &str,
) -> Result<(), TmuxError> {
    runner.run(&["rename-window", "-t", window_target, name])?;
    Ok(())
}

/// Whether `session` exists. Any failure (no server, no session) is `false`.
pub fn has_session(runner: &impl TmuxCommandRunner, session: &str) -> bool {
    let target = format!("={session}");
    runner.run(&["has-session", "-t", &target]).is_ok()
}

pub fn list_sessions(runner: &impl TmuxCommandRunner) -> Result<Vec<String>, TmuxError> {
    let output = runner.run(&["list-sessions", "-F", "#{session_name}"])?;
    Ok(output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(String::from)
        .collect())
}
