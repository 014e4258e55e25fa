//! Pane screen capture.

use herdmux_core::types::PaneTarget;

use crate::error::TmuxError;
use crate::executor::TmuxCommandRunner;

/// Capture the last `lines` lines of a pane, scrollback included.
pub fn capture_pane(
    runner: &impl TmuxCommandRunner,
    target: &PaneTarget,
    lines: u32,
) -> Result<String, TmuxError> {
    let start_line = format!("-{lines}");
    let target = target.to_string();
    runner.run(&["capture-pane", "-p", "-J", "-S", &start_line, "-t", &target])
}

/// Capture only what is on screen right now, split into lines.
pub fn capture_visible(
    runner: &impl TmuxCommandRunner,
    target: &PaneTarget,
) -> Result<Vec<String>, TmuxError> {
    let target = target.to_string();
    let output = runner.run(&["capture-pane", "-p", "-t", &target])?;
    Ok(output.lines().map(String::from).collect())
}
