//! Attached client terminals.

use crate::error::TmuxError;
use crate::executor::TmuxCommandRunner;

const LIST_CLIENTS_FORMAT: &str = "#{client_tty}\t#{client_session}";

/// A terminal attached to the server. Its tty is the only device that may
/// receive title and bell escapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxClient {
    pub tty: String,
    pub session: String,
}

pub fn list_clients(runner: &impl TmuxCommandRunner) -> Result<Vec<TmuxClient>, TmuxError> {
    let output = runner.run(&["list-clients", "-F", LIST_CLIENTS_FORMAT])?;
    let mut clients = Vec::new();
    for (idx, line) in output.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (tty, session) = line.split_once('\t').ok_or_else(|| TmuxError::ParseError {
            what: "list-clients",
            line_num: idx + 1,
            detail: "missing session field".to_string(),
        })?;
        clients.push(TmuxClient {
            tty: tty.to_string(),
            session: session.to_string(),
        });
    }
    Ok(clients)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockRunner(&'static str);

    impl TmuxCommandRunner for MockRunner {
        fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
            assert_eq!(args[0], "list-clients");
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn parse_clients() {
        let clients =
            list_clients(&MockRunner("/dev/ttys001\tagents\n/dev/ttys004\tops\n")).expect("list");
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].tty, "/dev/ttys001");
        assert_eq!(clients[1].session, "ops");
    }

    #[test]
    fn no_clients() {
        assert!(list_clients(&MockRunner("")).expect("list").is_empty());
    }

    #[test]
    fn malformed_line_is_error() {
        assert!(list_clients(&MockRunner("/dev/ttys001\n")).is_err());
    }
}
