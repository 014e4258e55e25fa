//! `herdmux relay`: type a recovery command into an agent pane, but only
//! when nobody is mid-keystroke there.

use chrono::{DateTime, Utc};
use herdmux_core::PaneTarget;
use herdmux_core::action_log::{ActionKind, ActionRecord};
use herdmux_tmux::{TmuxCommandRunner, clear_input_line, send_enter, send_literal};

use crate::action_log::ActionLog;
use crate::dispatch::prompt_line_is_empty;

/// Returns false (and sends nothing) when the prompt is not provably empty.
pub fn cmd_relay(
    runner: &impl TmuxCommandRunner,
    log: &ActionLog,
    target: &PaneTarget,
    words: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let text = words.join(" ").replace(['\n', '\r'], " ");
    if text.trim().is_empty() {
        anyhow::bail!("nothing to relay");
    }

    if !prompt_line_is_empty(runner, target) {
        tracing::info!(pane = %target, "relay refused: prompt not empty");
        log.record(
            &ActionRecord::new(ActionKind::RelayRefused, now)
                .field("target", target)
                .field("reason", "prompt_not_empty"),
        );
        return Ok(false);
    }

    clear_input_line(runner, target)?;
    send_literal(runner, target, &text)?;
    send_enter(runner, target)?;
    log.record(
        &ActionRecord::new(ActionKind::Relayed, now)
            .field("target", target)
            .field("text", &text),
    );
    Ok(true)
}
