//! Per-pane transition tracking with WORKING→IDLE hysteresis.
//!
//! Agents flicker through a bare prompt between tool calls, so a raw IDLE
//! observation following WORKING is only confirmed after
//! [`IDLE_CONFIRM_TICKS`] consecutive IDLE readings. Every other transition
//! (to WORKING, to EXITED, from UNKNOWN or EXITED into IDLE) applies on the
//! first observation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::types::{PaneState, PaneTarget};

/// Consecutive raw-IDLE ticks needed to confirm WORKING→IDLE.
pub const IDLE_CONFIRM_TICKS: u32 = 2;

/// In-memory state for one pane, owned by the running watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneRecord {
    pub target: PaneTarget,
    /// Last emitted (confirmed) state.
    pub state: PaneState,
    pub state_since: DateTime<Utc>,
    pub idle_confirm_count: u32,
    /// State last written to the pane tag; `None` until first written.
    pub last_reported_state: Option<PaneState>,
}

impl PaneRecord {
    pub fn new(target: PaneTarget, now: DateTime<Utc>) -> Self {
        Self {
            target,
            state: PaneState::Unknown,
            state_since: now,
            idle_confirm_count: 0,
            last_reported_state: None,
        }
    }

    /// Whether the tag on the pane needs rewriting.
    pub fn needs_report(&self) -> bool {
        self.last_reported_state != Some(self.state)
    }
}

/// Result of feeding one raw observation through the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: PaneState,
    pub emitted: PaneState,
    /// Emitted state differs from the previous tick's.
    pub changed: bool,
    /// Raw IDLE held back as WORKING pending confirmation.
    pub suppressed: bool,
}

impl Transition {
    /// A WORKING→IDLE change that survived hysteresis.
    pub fn is_confirmed_idle(&self) -> bool {
        self.changed && self.previous == PaneState::Working && self.emitted == PaneState::Idle
    }

    /// Pane moved into IDLE/EXITED from a known, different state.
    pub fn became_actionable(&self) -> bool {
        self.changed && self.previous != PaneState::Unknown && self.emitted.is_actionable()
    }
}

/// Apply one raw observation to a record. Pure apart from mutating `record`.
pub fn apply(record: &mut PaneRecord, raw: PaneState, now: DateTime<Utc>) -> Transition {
    let previous = record.state;
    let mut suppressed = false;

    let emitted = if raw == PaneState::Idle && previous == PaneState::Working {
        record.idle_confirm_count += 1;
        if record.idle_confirm_count >= IDLE_CONFIRM_TICKS {
            record.idle_confirm_count = 0;
            PaneState::Idle
        } else {
            suppressed = true;
            PaneState::Working
        }
    } else {
        record.idle_confirm_count = 0;
        raw
    };

    let changed = emitted != previous;
    if changed {
        record.state = emitted;
        record.state_since = now;
    }

    Transition {
        previous,
        emitted,
        changed,
        suppressed,
    }
}

/// Holds every [`PaneRecord`] for the lifetime of one polling loop.
#[derive(Debug, Clone, Default)]
pub struct TransitionTracker {
    records: HashMap<PaneTarget, PaneRecord>,
}

impl TransitionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw observation for `target`, creating its record on first sight.
    pub fn observe(&mut self, target: &PaneTarget, raw: PaneState, now: DateTime<Utc>) -> Transition {
        let record = self
            .records
            .entry(target.clone())
            .or_insert_with(|| PaneRecord::new(target.clone(), now));
        apply(record, raw, now)
    }

    pub fn get(&self, target: &PaneTarget) -> Option<&PaneRecord> {
        self.records.get(target)
    }

    pub fn get_mut(&mut self, target: &PaneTarget) -> Option<&mut PaneRecord> {
        self.records.get_mut(target)
    }

    /// Drop records for panes that are no longer listed.
    pub fn retain(&mut self, live: &[PaneTarget]) {
        self.records.retain(|target, _| live.contains(target));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-19T12:00:00Z")
            .expect("valid")
            .with_timezone(&Utc)
    }

    fn target() -> PaneTarget {
        PaneTarget::new("agents", 0, 1)
    }

    #[test]
    fn first_observation_applies_immediately() {
        let mut tracker = TransitionTracker::new();
        let tr = tracker.observe(&target(), PaneState::Idle, t0());
        assert_eq!(tr.previous, PaneState::Unknown);
        assert_eq!(tr.emitted, PaneState::Idle);
        assert!(tr.changed);
        assert!(!tr.is_confirmed_idle());
        assert!(!tr.became_actionable(), "first sighting is a baseline");
    }

    #[test]
    fn working_to_idle_needs_two_ticks() {
        let mut tracker = TransitionTracker::new();
        tracker.observe(&target(), PaneState::Working, t0());

        let first = tracker.observe(&target(), PaneState::Idle, t0() + TimeDelta::seconds(2));
        assert_eq!(first.emitted, PaneState::Working);
        assert!(first.suppressed);
        assert!(!first.changed);

        let second = tracker.observe(&target(), PaneState::Idle, t0() + TimeDelta::seconds(4));
        assert_eq!(second.emitted, PaneState::Idle);
        assert!(second.is_confirmed_idle());
        assert!(second.became_actionable());

        let record = tracker.get(&target()).expect("record");
        assert_eq!(record.state_since, t0() + TimeDelta::seconds(4));
        assert_eq!(record.idle_confirm_count, 0);
    }

    #[test]
    fn flicker_resets_confirmation() {
        let mut tracker = TransitionTracker::new();
        tracker.observe(&target(), PaneState::Working, t0());
        tracker.observe(&target(), PaneState::Idle, t0());
        tracker.observe(&target(), PaneState::Working, t0());
        let tr = tracker.observe(&target(), PaneState::Idle, t0());
        assert_eq!(tr.emitted, PaneState::Working, "counter restarted after flicker");
    }

    #[test]
    fn exited_is_immediate_from_working() {
        let mut tracker = TransitionTracker::new();
        tracker.observe(&target(), PaneState::Working, t0());
        let tr = tracker.observe(&target(), PaneState::Exited, t0());
        assert_eq!(tr.emitted, PaneState::Exited);
        assert!(tr.became_actionable());
        assert!(!tr.is_confirmed_idle());
    }

    #[test]
    fn exited_to_idle_is_immediate() {
        let mut tracker = TransitionTracker::new();
        tracker.observe(&target(), PaneState::Exited, t0());
        let tr = tracker.observe(&target(), PaneState::Idle, t0());
        assert_eq!(tr.emitted, PaneState::Idle);
    }

    #[test]
    fn unchanged_state_keeps_since() {
        let mut tracker = TransitionTracker::new();
        tracker.observe(&target(), PaneState::Working, t0());
        let tr = tracker.observe(&target(), PaneState::Working, t0() + TimeDelta::seconds(10));
        assert!(!tr.changed);
        assert_eq!(tracker.get(&target()).expect("record").state_since, t0());
    }

    #[test]
    fn needs_report_tracks_last_written_tag() {
        let mut tracker = TransitionTracker::new();
        tracker.observe(&target(), PaneState::Working, t0());
        let record = tracker.get_mut(&target()).expect("record");
        assert!(record.needs_report());
        record.last_reported_state = Some(PaneState::Working);
        assert!(!record.needs_report());
    }

    #[test]
    fn retain_forgets_vanished_panes() {
        let mut tracker = TransitionTracker::new();
        let other = PaneTarget::new("agents", 0, 2);
        tracker.observe(&target(), PaneState::Working, t0());
        tracker.observe(&other, PaneState::Working, t0());
        tracker.retain(&[other.clone()]);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.get(&target()).is_none());
    }
}
