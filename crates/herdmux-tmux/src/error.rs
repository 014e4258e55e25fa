//! Error types for the tmux control surface.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TmuxError {
    #[error("tmux command failed: {0}")]
    CommandFailed(String),

    #[error("failed to parse {what} line {line_num}: {detail}")]
    ParseError {
        what: &'static str,
        line_num: usize,
        detail: String,
    },

    #[error("tmux io error: {0}")]
    Io(#[from] std::io::Error),
}
