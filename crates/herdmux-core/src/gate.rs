//! Conductor gate: rate limit and the empty-prompt safety check.

use chrono::{DateTime, TimeDelta, Utc};

use crate::classify::{is_bare_prompt_line, is_decoration_line};

/// Minimum spacing between two conductor notifications.
pub const TRIGGER_MIN_INTERVAL_SECS: i64 = 30;

/// True iff there is something to report and `min_interval` has elapsed
/// since the last trigger. The boundary is inclusive.
pub fn should_trigger(
    has_actionable: bool,
    last_trigger_at: DateTime<Utc>,
    min_interval: TimeDelta,
    now: DateTime<Utc>,
) -> bool {
    has_actionable && now.signed_duration_since(last_trigger_at) >= min_interval
}

/// Whether the conductor's input line is provably empty.
///
/// Looks at the last line that is neither blank nor pure box drawing and
/// accepts only a lone prompt glyph. Anything else, including no such line
/// at all, is a refusal.
pub fn is_prompt_empty<S: AsRef<str>>(tail_lines: &[S]) -> bool {
    tail_lines
        .iter()
        .map(|line| AsRef::<str>::as_ref(line))
        .rev()
        .find(|line| !is_decoration_line(line))
        .is_some_and(is_bare_prompt_line)
}
