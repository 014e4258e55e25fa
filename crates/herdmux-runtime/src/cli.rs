//! CLI definition using clap derive.

use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use clap::{Args, Parser, Subcommand};

use crate::config::{ENV_STATE_DIR, WATCH_INTERVAL_SECS, WatchConfig};

#[derive(Parser)]
#[command(name = "herdmux", version, about = "Watch agent panes in tmux and wake the conductor")]
pub struct Cli {
    /// Directory for locks, pending batch, reports and the action log
    #[arg(long, global = true, env = ENV_STATE_DIR)]
    pub state_dir: Option<PathBuf>,

    /// tmux socket path (else HERDMUX_TMUX_SOCKET_PATH, then HERDMUX_TMUX_SOCKET_NAME)
    #[arg(long, global = true)]
    pub tmux_socket: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Watch one session: publish pane states, label windows, ring on idle
    Watch(WatchOpts),
    /// Watch every session and notify the conductor pane
    Conductor(ConductorOpts),
    /// Stop a running watcher
    Stop(StopOpts),
    /// Hold conductor notifications (actionable panes keep queueing)
    Pause,
    /// Resume conductor notifications
    Resume,
    /// Write the status report and print its path
    Report,
    /// One-line state summary of all monitored panes
    Status(StatusOpts),
    /// Type a command into a pane whose prompt is empty
    Relay(RelayOpts),
}

#[derive(Args)]
pub struct IntervalOpts {
    /// Seconds between ticks
    #[arg(long, default_value_t = WATCH_INTERVAL_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: u64,
}

#[derive(Args)]
pub struct WatchOpts {
    /// tmux session name
    pub session: String,

    #[command(flatten)]
    pub interval: IntervalOpts,
}

#[derive(Args)]
pub struct ConductorOpts {
    #[command(flatten)]
    pub interval: IntervalOpts,

    /// Minimum seconds between two conductor notifications
    #[arg(long, default_value_t = herdmux_core::TRIGGER_MIN_INTERVAL_SECS)]
    pub min_trigger_secs: i64,
}

#[derive(Args)]
pub struct StopOpts {
    /// Session whose watcher to stop
    #[arg(required_unless_present = "conductor", conflicts_with = "conductor")]
    pub session: Option<String>,

    /// Stop the conductor watcher instead
    #[arg(long)]
    pub conductor: bool,
}

#[derive(Args)]
pub struct StatusOpts {
    /// JSON array instead of the compact line
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct RelayOpts {
    /// Pane target, `session:window.pane`
    pub target: herdmux_core::PaneTarget,

    /// Text to type; joined with spaces and submitted with Enter
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub text: Vec<String>,
}

impl WatchOpts {
    pub fn config(&self) -> WatchConfig {
        WatchConfig {
            interval: Duration::from_secs(self.interval.interval_secs),
            ..WatchConfig::default()
        }
    }
}

impl ConductorOpts {
    pub fn config(&self) -> WatchConfig {
        WatchConfig {
            interval: Duration::from_secs(self.interval.interval_secs),
            min_trigger_interval: TimeDelta::seconds(self.min_trigger_secs.max(0)),
            ..WatchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn conductor_defaults() {
        let cli = Cli::try_parse_from(["herdmux", "conductor"]).expect("parse");
        let Command::Conductor(opts) = cli.command else {
            panic!("expected conductor");
        };
        let config = opts.config();
        assert_eq!(config.interval, Duration::from_secs(2));
        assert_eq!(config.min_trigger_interval, TimeDelta::seconds(30));
    }

    #[test]
    fn stop_requires_a_scope() {
        assert!(Cli::try_parse_from(["herdmux", "stop"]).is_err());
        assert!(Cli::try_parse_from(["herdmux", "stop", "agents", "--conductor"]).is_err());
        assert!(Cli::try_parse_from(["herdmux", "stop", "--conductor"]).is_ok());
    }

    #[test]
    fn relay_parses_target_and_text() {
        let cli = Cli::try_parse_from(["herdmux", "relay", "agents:0.1", "/resume", "--force"])
            .expect("parse");
        let Command::Relay(opts) = cli.command else {
            panic!("expected relay");
        };
        assert_eq!(opts.target, herdmux_core::PaneTarget::new("agents", 0, 1));
        assert_eq!(opts.text, vec!["/resume".to_string(), "--force".to_string()]);
    }

    #[test]
    fn relay_rejects_bad_target() {
        assert!(Cli::try_parse_from(["herdmux", "relay", "agents", "x"]).is_err());
    }

    #[test]
    fn zero_interval_rejected() {
        assert!(Cli::try_parse_from(["herdmux", "watch", "agents", "--interval-secs", "0"]).is_err());
    }
}
