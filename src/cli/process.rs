use std::{
    env,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{anyhow, Context, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::{debug, info};

pub const DAEMON_BINARY_NAME: &str = "daybook-daemon";

/// The daemon binary is installed next to the cli one.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name(DAEMON_BINARY_NAME);
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}

pub fn daemon_path() -> Result<PathBuf> {
    let current = env::current_exe().context("Can't operate without an executable")?;
    Ok(to_daemon_path(current))
}

/// Terminates every other process started from `name` and returns how many were found.
pub fn kill_previous_servers(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get current pid: {e}"))?;
    let mut killed = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            debug!("Terminating previous daemon {pid}");
            // This will forcefully terminate the process on Windows.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            killed += 1;
        }
    }
    Ok(killed)
}

/// Stops a running daemon and starts a new one for `dir`. The daemon binary detaches by itself,
/// so this only waits for the launcher to return.
pub fn restart_server(dir: &Path) -> Result<()> {
    let daemon = daemon_path()?;
    let killed = kill_previous_servers(&daemon)?;
    if killed > 0 {
        info!("Stopped {killed} running daemons");
    }

    let mut command = std::process::Command::new(&daemon);
    command.arg("--dir").arg(dir);
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    let status = command
        .status()
        .with_context(|| format!("Failed to start {daemon:?}"))?;
    if !status.success() {
        return Err(anyhow!("Daemon launcher exited with {status}"));
    }
    Ok(())
}
