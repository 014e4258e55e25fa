//! Screen-scrape state classifier.
//!
//! Maps `(foreground command, captured screen text)` to a raw [`PaneState`]
//! through an ordered rule table. First match wins and the order is part of
//! the contract: the interrupt hint must beat the idle prompt because both
//! can be visible in scrollback at once.

use crate::types::{PaneSnapshot, PaneState};

/// Shown by the agent only while it is actively producing output.
pub const INTERRUPT_HINT: &str = "esc to interrupt";

/// Shown under the input box when the agent is waiting at its prompt.
pub const SHORTCUTS_HINT: &str = "? for shortcuts";

/// Bare prompt glyphs drawn by the agent's input line.
pub const PROMPT_GLYPHS: &[char] = &['>', '\u{276f}'];

/// Foreground commands meaning the agent has exited back to its shell.
pub const SHELL_COMMANDS: &[&str] = &["bash", "zsh", "sh", "fish", "dash"];

/// One entry of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyRule {
    pub name: &'static str,
    pub matches: fn(&str, &str) -> bool,
    pub state: PaneState,
}

/// Evaluated top to bottom; anything unmatched is WORKING.
pub const RULES: &[ClassifyRule] = &[
    ClassifyRule {
        name: "shell_foreground",
        matches: |cmd, _| is_shell_command(cmd),
        state: PaneState::Exited,
    },
    ClassifyRule {
        name: "interrupt_hint",
        matches: |_, text| text.contains(INTERRUPT_HINT),
        state: PaneState::Working,
    },
    ClassifyRule {
        name: "idle_prompt",
        matches: |_, text| text.contains(SHORTCUTS_HINT) || text.lines().any(is_bare_prompt_line),
        state: PaneState::Idle,
    },
];

/// Classify one reading. Blank text with a non-shell command is WORKING.
pub fn classify(foreground_command: &str, raw_text: &str) -> PaneState {
    matching_rule(foreground_command, raw_text)
        .map(|rule| rule.state)
        .unwrap_or(PaneState::Working)
}

pub fn classify_snapshot(snapshot: &PaneSnapshot) -> PaneState {
    classify(&snapshot.foreground_command, &snapshot.raw_text)
}

/// The rule that decided a classification, if any (for debug logging).
pub fn matching_rule(foreground_command: &str, raw_text: &str) -> Option<&'static ClassifyRule> {
    RULES
        .iter()
        .find(|rule| (rule.matches)(foreground_command, raw_text))
}

/// `bash`, `zsh`, ... including login-shell forms such as `-zsh`.
pub fn is_shell_command(cmd: &str) -> bool {
    let name = cmd.trim().trim_start_matches('-');
    let name = name.rsplit('/').next().unwrap_or(name);
    SHELL_COMMANDS.contains(&name)
}

/// A line holding only a prompt glyph, optionally indented.
pub fn is_bare_prompt_line(line: &str) -> bool {
    let trimmed = line.trim();
    let mut chars = trimmed.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if PROMPT_GLYPHS.contains(&c))
}

/// Blank, or drawn only with box-drawing characters (input box borders).
pub fn is_decoration_line(line: &str) -> bool {
    line.chars()
        .all(|c| c.is_whitespace() || ('\u{2500}'..='\u{257f}').contains(&c))
}
