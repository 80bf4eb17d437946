use std::path::Path;

use anyhow::Result;
use clap::Subcommand;

use crate::{
    config::Config,
    daemon::{processing::notify::TerminalAlert, start_daemon},
};

use super::process::{daemon_path, kill_previous_servers, restart_server};

#[derive(Debug, Subcommand)]
pub enum DaemonCommand {
    #[command(about = "Start the background daemon, replacing a running one")]
    Start,
    #[command(about = "Stop the running daemon")]
    Stop,
    #[command(
        about = "Run the daemon directly in current console. Used for debugging"
    )]
    Serve,
}

pub async fn process_daemon_command(
    command: DaemonCommand,
    dir: &Path,
    config: &Config,
) -> Result<()> {
    match command {
        DaemonCommand::Start => {
            restart_server(dir)?;
            println!("Daemon started");
        }
        DaemonCommand::Stop => {
            let killed = kill_previous_servers(&daemon_path()?)?;
            println!("Stopped {killed} daemons");
        }
        DaemonCommand::Serve => start_daemon(dir, config, TerminalAlert).await?,
    }
    Ok(())
}
