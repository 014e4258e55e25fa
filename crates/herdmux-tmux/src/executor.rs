//! TmuxCommandRunner trait and TmuxExecutor (sync subprocess wrapper).

use crate::error::TmuxError;

/// Socket path override, checked before [`ENV_SOCKET_NAME`].
pub const ENV_SOCKET_PATH: &str = "HERDMUX_TMUX_SOCKET_PATH";
pub const ENV_SOCKET_NAME: &str = "HERDMUX_TMUX_SOCKET_NAME";

/// Runs one tmux command and returns its stdout. Mock-injectable for tests.
pub trait TmuxCommandRunner {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError>;
}

impl<T: TmuxCommandRunner + ?Sized> TmuxCommandRunner for &T {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        (**self).run(args)
    }
}

/// Real tmux executor using `std::process::Command`.
#[derive(Debug, Clone)]
pub struct TmuxExecutor {
    tmux_bin: String,
    socket_path: Option<String>,
    socket_name: Option<String>,
}

impl TmuxExecutor {
    pub fn new(tmux_bin: impl Into<String>) -> Self {
        Self {
            tmux_bin: tmux_bin.into(),
            socket_path: None,
            socket_name: None,
        }
    }

    /// Socket targeting: explicit path > `HERDMUX_TMUX_SOCKET_PATH` > `HERDMUX_TMUX_SOCKET_NAME`.
    pub fn from_env(explicit_socket: Option<&str>) -> Self {
        Self::resolve(
            explicit_socket.map(str::to_string),
            std::env::var(ENV_SOCKET_PATH).ok(),
            std::env::var(ENV_SOCKET_NAME).ok(),
        )
    }

    fn resolve(explicit: Option<String>, env_path: Option<String>, env_name: Option<String>) -> Self {
        let executor = Self::default();
        match (explicit.or(env_path), env_name) {
            (Some(path), _) => executor.with_socket_path(path),
            (None, Some(name)) => executor.with_socket_name(name),
            (None, None) => executor,
        }
    }

    #[must_use]
    pub fn with_socket_path(mut self, path: impl Into<String>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_socket_name(mut self, name: impl Into<String>) -> Self {
        self.socket_name = Some(name.into());
        self
    }
}

impl Default for TmuxExecutor {
    fn default() -> Self {
        Self::new("tmux")
    }
}

impl TmuxCommandRunner for TmuxExecutor {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        let mut cmd = std::process::Command::new(&self.tmux_bin);
        if let Some(ref path) = self.socket_path {
            cmd.args(["-S", path]);
        } else if let Some(ref name) = self.socket_name {
            cmd.args(["-L", name]);
        }
        cmd.args(args);
        tracing::trace!(?args, "tmux");
        let output = cmd.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TmuxError::CommandFailed(format!(
                "{} (exit code {}): {}",
                args.first().copied().unwrap_or("tmux"),
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
