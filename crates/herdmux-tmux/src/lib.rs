//! herdmux-tmux: the terminal multiplexer as an IO boundary.
//! Subprocess execution, pane/client listing, capture, pane tags and
//! synthetic keystrokes. No business logic.

pub mod capture;
pub mod clients;
pub mod control;
pub mod error;
pub mod executor;
pub mod pane_info;

pub use capture::{capture_pane, capture_visible};
pub use clients::{TmuxClient, list_clients};
pub use control::{
    TAG_NAME, TAG_ROLE, TAG_SINCE, TAG_STATE, clear_input_line, has_session, list_sessions,
    rename_window, select_pane, send_enter, send_literal, set_pane_tag,
};
pub use error::TmuxError;
pub use executor::{TmuxCommandRunner, TmuxExecutor};
pub use pane_info::{LIST_PANES_FORMAT, TmuxPaneInfo, list_panes, list_session_panes};
