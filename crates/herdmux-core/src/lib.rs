//! herdmux-core: pure pane-state logic.
//! Classification, hysteresis, the conductor gate, pending batches and
//! report rendering. No IO; callers own the clock and the control surface.

pub mod action_log;
pub mod classify;
pub mod gate;
pub mod pending;
pub mod report;
pub mod transition;
pub mod types;

pub use classify::{classify, classify_snapshot};
pub use gate::{TRIGGER_MIN_INTERVAL_SECS, is_prompt_empty, should_trigger};
pub use pending::{PendingBatch, PendingEntry};
pub use transition::{IDLE_CONFIRM_TICKS, PaneRecord, Transition, TransitionTracker};
pub use types::{HerdError, PaneRole, PaneSnapshot, PaneState, PaneTarget};
