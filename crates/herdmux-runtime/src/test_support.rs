//! In-memory tmux server for multi-tick tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use herdmux_core::PaneTarget;
use herdmux_tmux::{TAG_NAME, TAG_ROLE, TmuxCommandRunner, TmuxError};

#[derive(Debug, Clone)]
struct FakePane {
    target: PaneTarget,
    id: u32,
    window_name: String,
    window_active: bool,
    cmd: String,
    cwd: String,
    tty: String,
    screen: String,
    tags: HashMap<String, String>,
}

/// Canned tmux answering the subset of commands herdmux issues, recording
/// every invocation and applying tag/rename writes to its own state.
#[derive(Debug, Default)]
pub struct FakeTmuxBackend {
    panes: RefCell<Vec<FakePane>>,
    clients: RefCell<Vec<(String, String)>>,
    calls: RefCell<Vec<Vec<String>>>,
    server_down: Cell<bool>,
    fail_capture: RefCell<Vec<PaneTarget>>,
}

fn target(s: &str) -> PaneTarget {
    s.parse().expect("test target")
}

impl FakeTmuxBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&self, target_str: &str, role: Option<&str>, name: &str, cmd: &str, screen: &str) {
        let target = target(target_str);
        let mut panes = self.panes.borrow_mut();
        let window_active = target.window == 0;
        let id = u32::try_from(panes.len()).expect("few panes");
        let mut tags = HashMap::new();
        if let Some(role) = role {
            tags.insert(TAG_ROLE.to_string(), role.to_string());
        }
        if !name.is_empty() {
            tags.insert(TAG_NAME.to_string(), name.to_string());
        }
        panes.push(FakePane {
            window_name: format!("w{}", target.window),
            window_active,
            cmd: cmd.to_string(),
            cwd: format!("/work/{name}"),
            tty: format!("/dev/pts/{}", 100 + id),
            screen: screen.to_string(),
            tags,
            id,
            target,
        });
    }

    /// Window 0 of each session is the active one.
    pub fn add_agent(&self, target: &str, name: &str, cmd: &str, screen: &str) {
        self.add(target, Some("agent"), name, cmd, screen);
    }

    pub fn add_conductor(&self, target: &str, screen: &str) {
        self.add(target, Some("conductor"), "conductor", "claude", screen);
    }

    pub fn add_untagged(&self, target: &str, cmd: &str, screen: &str) {
        self.add(target, None, "", cmd, screen);
    }

    pub fn add_client(&self, tty: &str, session: &str) {
        self.clients
            .borrow_mut()
            .push((tty.to_string(), session.to_string()));
    }

    fn with_pane(&self, target_str: &str, f: impl FnOnce(&mut FakePane)) {
        let t = target(target_str);
        let mut panes = self.panes.borrow_mut();
        let pane = panes
            .iter_mut()
            .find(|p| p.target == t)
            .expect("pane exists");
        f(pane);
    }

    pub fn set_screen(&self, target: &str, screen: &str) {
        self.with_pane(target, |p| p.screen = screen.to_string());
    }

    pub fn set_tty(&self, target: &str, tty: &str) {
        self.with_pane(target, |p| p.tty = tty.to_string());
    }

    pub fn set_command(&self, target: &str, cmd: &str) {
        self.with_pane(target, |p| p.cmd = cmd.to_string());
    }

    pub fn remove_pane(&self, target_str: &str) {
        let t = target(target_str);
        self.panes.borrow_mut().retain(|p| p.target != t);
    }

    pub fn fail_capture(&self, target_str: &str) {
        self.fail_capture.borrow_mut().push(target(target_str));
    }

    pub fn kill_server(&self) {
        self.server_down.set(true);
    }

    pub fn tag(&self, target_str: &str, key: &str) -> Option<String> {
        let t = target(target_str);
        self.panes
            .borrow()
            .iter()
            .find(|p| p.target == t)
            .and_then(|p| p.tags.get(key).cloned())
    }

    pub fn window_name(&self, target_str: &str) -> String {
        let t = target(target_str);
        self.panes
            .borrow()
            .iter()
            .find(|p| p.target == t)
            .map(|p| p.window_name.clone())
            .expect("pane exists")
    }

    pub fn pane_tty(&self, target_str: &str) -> String {
        let t = target(target_str);
        self.panes
            .borrow()
            .iter()
            .find(|p| p.target == t)
            .map(|p| p.tty.clone())
            .expect("pane exists")
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Every command of the given tmux verb, in order.
    pub fn calls_of(&self, verb: &str) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.first().map(String::as_str) == Some(verb))
            .cloned()
            .collect()
    }

    fn list_line(p: &FakePane) -> String {
        let tag = |k: &str| p.tags.get(k).cloned().unwrap_or_default();
        [
            p.target.session.clone(),
            p.target.window.to_string(),
            p.target.pane.to_string(),
            format!("%{}", p.id),
            p.window_name.clone(),
            u8::from(p.window_active).to_string(),
            "0".to_string(),
            p.cmd.clone(),
            p.cwd.clone(),
            String::new(),
            p.tty.clone(),
            tag("@herd_role"),
            tag("@herd_name"),
            tag("@herd_state"),
            tag("@herd_since"),
        ]
        .join("\t")
    }

    fn arg_after<'a>(args: &'a [&str], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| *a == flag)
            .and_then(|i| args.get(i + 1).copied())
    }

    fn sessions(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for p in self.panes.borrow().iter() {
            if !names.contains(&p.target.session) {
                names.push(p.target.session.clone());
            }
        }
        names
    }
}

impl TmuxCommandRunner for FakeTmuxBackend {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        self.calls
            .borrow_mut()
            .push(args.iter().map(|a| a.to_string()).collect());
        if self.server_down.get() {
            return Err(TmuxError::CommandFailed(
                "tmux exited with 1: no server running".to_string(),
            ));
        }

        match args.first().copied() {
            Some("list-panes") => {
                let session = Self::arg_after(args, "-t").map(|t| t.trim_start_matches('='));
                let panes = self.panes.borrow();
                let lines: Vec<String> = panes
                    .iter()
                    .filter(|p| session.is_none_or(|s| p.target.session == s))
                    .map(Self::list_line)
                    .collect();
                if let (Some(s), true) = (session, lines.is_empty()) {
                    return Err(TmuxError::CommandFailed(format!("can't find session: {s}")));
                }
                Ok(lines.iter().map(|l| format!("{l}\n")).collect())
            }
            Some("capture-pane") => {
                let t = target(Self::arg_after(args, "-t").unwrap_or_default());
                if self.fail_capture.borrow().contains(&t) {
                    return Err(TmuxError::CommandFailed("can't find pane".to_string()));
                }
                self.panes
                    .borrow()
                    .iter()
                    .find(|p| p.target == t)
                    .map(|p| format!("{}\n", p.screen))
                    .ok_or_else(|| TmuxError::CommandFailed("can't find pane".to_string()))
            }
            Some("set-option") => {
                let t = Self::arg_after(args, "-t").unwrap_or_default().to_string();
                let key = args[args.len() - 2].to_string();
                let value = args[args.len() - 1].to_string();
                self.with_pane(&t, |p| {
                    p.tags.insert(key, value);
                });
                Ok(String::new())
            }
            Some("rename-window") => {
                let window = Self::arg_after(args, "-t").unwrap_or_default();
                let name = args[args.len() - 1].to_string();
                for p in self.panes.borrow_mut().iter_mut() {
                    if p.target.window_target() == window {
                        p.window_name = name.clone();
                    }
                }
                Ok(String::new())
            }
            Some("has-session") => {
                let s = Self::arg_after(args, "-t")
                    .unwrap_or_default()
                    .trim_start_matches('=');
                if self.sessions().iter().any(|n| n == s) {
                    Ok(String::new())
                } else {
                    Err(TmuxError::CommandFailed(format!("can't find session: {s}")))
                }
            }
            Some("list-sessions") => Ok(self.sessions().iter().map(|s| format!("{s}\n")).collect()),
            Some("list-clients") => Ok(self
                .clients
                .borrow()
                .iter()
                .map(|(tty, s)| format!("{tty}\t{s}\n"))
                .collect()),
            _ => Ok(String::new()),
        }
    }
}
