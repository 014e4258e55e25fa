//! herdmux: watches agent panes in tmux and wakes a conductor agent when
//! they need attention.

use chrono::Utc;
use clap::Parser;
use herdmux_tmux::TmuxExecutor;

mod action_log;
mod alerts;
mod cli;
mod clock;
mod cmd_pause;
mod cmd_relay;
mod cmd_status;
mod cmd_watch;
mod config;
mod dispatch;
mod lock;
mod scanner;
mod state_files;
#[cfg(test)]
mod test_support;
mod watcher;

fn init_tracing() {
    let filter = std::env::var("HERDMUX_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    init_tracing();

    let paths = config::StatePaths::resolve(args.state_dir.as_deref());
    let executor = TmuxExecutor::from_env(args.tmux_socket.as_deref());

    match args.command {
        cli::Command::Watch(opts) => {
            let config = opts.config();
            cmd_watch::cmd_watch(&executor, &paths, &opts.session, config).await?;
        }
        cli::Command::Conductor(opts) => {
            cmd_watch::cmd_conductor(&executor, &paths, opts.config()).await?;
        }
        cli::Command::Stop(opts) => {
            let session = if opts.conductor {
                None
            } else {
                opts.session.as_deref()
            };
            cmd_watch::cmd_stop(&paths, session)?;
        }
        cli::Command::Pause => {
            cmd_pause::cmd_pause(&paths, Utc::now())?;
        }
        cli::Command::Resume => {
            cmd_pause::cmd_resume(&paths, Utc::now())?;
        }
        cli::Command::Report => {
            cmd_status::cmd_report(&executor, &paths, Utc::now())?;
        }
        cli::Command::Status(opts) => {
            cmd_status::cmd_status(&executor, opts.json)?;
        }
        cli::Command::Relay(opts) => {
            paths.ensure_dir()?;
            let log = action_log::ActionLog::new(paths.action_log());
            let relayed =
                cmd_relay::cmd_relay(&executor, &log, &opts.target, &opts.text, Utc::now())?;
            if !relayed {
                eprintln!("refused: {} has text on its input line", opts.target);
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
