use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Errors ───────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum HerdError {
    #[error("invalid pane target: {0}")]
    InvalidTarget(String),

    #[error("invalid pane state: {0}")]
    InvalidState(String),

    #[error("invalid pending line {line_num}: {detail}")]
    InvalidPendingLine { line_num: usize, detail: String },
}

// ─── Pane state ───────────────────────────────────────────────────

/// Externally visible state of a monitored agent pane.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PaneState {
    #[default]
    Unknown,
    Working,
    Idle,
    Exited,
}

impl PaneState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Working => "working",
            Self::Idle => "idle",
            Self::Exited => "exited",
        }
    }

    /// Label used in reports, pending files and the action log.
    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Working => "WORKING",
            Self::Idle => "IDLE",
            Self::Exited => "EXITED",
        }
    }

    /// IDLE and EXITED panes are waiting on someone.
    pub fn is_actionable(self) -> bool {
        matches!(self, Self::Idle | Self::Exited)
    }
}

impl fmt::Display for PaneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaneState {
    type Err = HerdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" | "" => Ok(Self::Unknown),
            "working" => Ok(Self::Working),
            "idle" => Ok(Self::Idle),
            "exited" => Ok(Self::Exited),
            other => Err(HerdError::InvalidState(other.to_string())),
        }
    }
}

// ─── Pane target ──────────────────────────────────────────────────

/// Composite pane address: `session:window.pane`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaneTarget {
    pub session: String,
    pub window: u32,
    pub pane: u32,
}

impl PaneTarget {
    pub fn new(session: impl Into<String>, window: u32, pane: u32) -> Self {
        Self {
            session: session.into(),
            window,
            pane,
        }
    }

    /// `session:window` address of the containing window.
    pub fn window_target(&self) -> String {
        format!("{}:{}", self.session, self.window)
    }
}

impl fmt::Display for PaneTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.session, self.window, self.pane)
    }
}

impl FromStr for PaneTarget {
    type Err = HerdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HerdError::InvalidTarget(s.to_string());
        // Session names may contain ':' so split from the right.
        let (session, rest) = s.rsplit_once(':').ok_or_else(invalid)?;
        let (window, pane) = rest.split_once('.').ok_or_else(invalid)?;
        if session.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            session: session.to_string(),
            window: window.parse().map_err(|_| invalid())?,
            pane: pane.parse().map_err(|_| invalid())?,
        })
    }
}

// ─── Pane role ────────────────────────────────────────────────────

/// Identity marker stored on a pane; untagged panes are not monitored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaneRole {
    Agent,
    Conductor,
}

impl PaneRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Conductor => "conductor",
        }
    }

    /// Parse a tag value; anything unrecognised means "not monitored".
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "agent" => Some(Self::Agent),
            "conductor" => Some(Self::Conductor),
            _ => None,
        }
    }
}

// ─── Snapshot ─────────────────────────────────────────────────────

/// One fresh reading of a pane. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaneSnapshot {
    pub foreground_command: String,
    pub raw_text: String,
}
