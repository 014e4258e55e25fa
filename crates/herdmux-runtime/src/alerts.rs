//! Bell and title escapes for attached client terminals.
//!
//! Escapes go to client ttys only. A monitored pane's tty would inject the
//! bytes into the agent's own screen.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use herdmux_tmux::{TmuxCommandRunner, list_clients};

const BEL: &str = "\x07";

pub trait Alerts {
    /// Ttys that must never receive escapes (the monitored panes' own).
    fn protect_ttys(&mut self, _ttys: &[String]) {}
    fn bell(&mut self, session: &str);
    fn title(&mut self, session: &str, title: &str);
}

/// OSC 0 "set window title".
pub fn osc_title(title: &str) -> String {
    let clean: String = title.chars().filter(|c| !c.is_control()).collect();
    format!("\x1b]0;{clean}{BEL}")
}

/// Writes to every tty attached to a session.
pub struct ClientTtyAlerts<R> {
    runner: R,
    protected: HashSet<String>,
    last_title: HashMap<String, String>,
}

impl<R: TmuxCommandRunner> ClientTtyAlerts<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            protected: HashSet::new(),
            last_title: HashMap::new(),
        }
    }

    fn client_ttys(&self, session: &str) -> Vec<String> {
        match list_clients(&self.runner) {
            Ok(clients) => clients
                .into_iter()
                .filter(|c| c.session == session && !self.protected.contains(&c.tty))
                .map(|c| c.tty)
                .collect(),
            Err(e) => {
                tracing::debug!(session, "list-clients failed: {e}");
                Vec::new()
            }
        }
    }

    fn write_all(&self, session: &str, bytes: &str) {
        for tty in self.client_ttys(session) {
            let result = std::fs::OpenOptions::new()
                .append(true)
                .open(&tty)
                .and_then(|mut f| f.write_all(bytes.as_bytes()));
            if let Err(e) = result {
                tracing::debug!(tty, "client tty write failed: {e}");
            }
        }
    }
}

impl<R: TmuxCommandRunner> Alerts for ClientTtyAlerts<R> {
    fn protect_ttys(&mut self, ttys: &[String]) {
        self.protected = ttys.iter().filter(|t| !t.is_empty()).cloned().collect();
    }

    fn bell(&mut self, session: &str) {
        self.write_all(session, BEL);
    }

    fn title(&mut self, session: &str, title: &str) {
        if self.last_title.get(session).map(String::as_str) == Some(title) {
            return;
        }
        self.write_all(session, &osc_title(title));
        self.last_title
            .insert(session.to_string(), title.to_string());
    }
}

/// For watchers that must not touch any terminal.
#[derive(Debug, Default)]
pub struct SilentAlerts;

impl Alerts for SilentAlerts {
    fn bell(&mut self, _session: &str) {}
    fn title(&mut self, _session: &str, _title: &str) {}
}
