use std::{
    collections::HashMap,
    fmt::Display,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{bail, Context, Result};
use tokio::{process::Command, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::{daemon::processing::module::EventProcessor, utils::clock::Clock};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Modification time and length of every file below a root.
pub type Snapshot = HashMap<PathBuf, (SystemTime, u64)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        };
        write!(f, "{value}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Files that vanish between listing and reading their metadata are skipped.
pub fn snapshot(root: &Path) -> Snapshot {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            Some((entry.into_path(), (metadata.modified().ok()?, metadata.len())))
        })
        .collect()
}

pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<FileEvent> {
    let mut events = current
        .iter()
        .filter_map(|(path, state)| {
            let kind = match previous.get(path) {
                None => ChangeKind::Created,
                Some(old) if old != state => ChangeKind::Modified,
                Some(_) => return None,
            };
            Some(FileEvent {
                path: path.clone(),
                kind,
            })
        })
        .chain(
            previous
                .keys()
                .filter(|path| !current.contains_key(*path))
                .map(|path| FileEvent {
                    path: path.clone(),
                    kind: ChangeKind::Deleted,
                }),
        )
        .collect::<Vec<_>>();
    events.sort_by(|a, b| a.path.cmp(&b.path));
    events
}

/// Polls a directory tree and forwards every change. Renames show up as a deletion plus a
/// creation.
pub struct FolderMonitor {
    root: PathBuf,
    next: mpsc::Sender<FileEvent>,
    shutdown: CancellationToken,
    poll_interval: Duration,
    time_provider: Box<dyn Clock>,
}

impl FolderMonitor {
    pub fn new(
        root: PathBuf,
        next: mpsc::Sender<FileEvent>,
        shutdown: CancellationToken,
        poll_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Result<Self> {
        if !root.is_dir() {
            bail!("Folder {root:?} does not exist");
        }
        Ok(Self {
            root,
            next,
            shutdown,
            poll_interval,
            time_provider,
        })
    }

    pub async fn run(self) -> Result<()> {
        info!("Monitoring folder {:?}", self.root);
        let mut previous = snapshot(&self.root);
        let mut poll_point = self.time_provider.instant();
        loop {
            poll_point += self.poll_interval;

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(poll_point) => ()
            }

            let current = snapshot(&self.root);
            for event in diff(&previous, &current) {
                debug!("Sending file event {:?}", event);
                self.next
                    .send(event)
                    .await
                    .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
            }
            previous = current;
        }
    }
}

/// Prints every event and runs the configured command with `<path> <action>` appended.
pub struct ActionRunner {
    command: Vec<String>,
}

impl ActionRunner {
    /// An empty command only prints.
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl EventProcessor<FileEvent> for ActionRunner {
    async fn process_next(&mut self, event: FileEvent) -> Result<()> {
        println!("File {}: {}", event.kind, event.path.display());

        let Some((program, args)) = self.command.split_first() else {
            return Ok(());
        };
        let output = Command::new(program)
            .args(args)
            .arg(&event.path)
            .arg(event.kind.to_string())
            .output()
            .await
            .with_context(|| format!("Failed to start action {program}"))?;

        if !output.status.success() {
            warn!(
                "Action failed for {:?} with {}: {}",
                event.path,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            bail!("Action exited with {}", output.status);
        }
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        info!("Monitoring stopped");
        Ok(())
    }
}
