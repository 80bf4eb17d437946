use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::utils::clock::Clock;

pub const BACKUP_PREFIX: &str = "backup_";

fn copy_tree(source: &Path, destination: &Path) -> Result<u64> {
    std::fs::create_dir(destination)
        .with_context(|| format!("Failed to create backup directory {destination:?}"))?;

    let mut copied = 0;
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source)?;
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {:?}", entry.path()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Copies `source` into `target/backup_YYYYmmdd_HHMMSS` and returns the new directory.
pub async fn backup_directory(
    source: &Path,
    target: &Path,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    if !tokio::fs::try_exists(source).await? {
        bail!("Source directory {source:?} does not exist");
    }
    tokio::fs::create_dir_all(target)
        .await
        .with_context(|| format!("Failed to create {target:?}"))?;

    let destination = target.join(format!("{BACKUP_PREFIX}{}", now.format("%Y%m%d_%H%M%S")));
    let copied = {
        let source = source.to_path_buf();
        let destination = destination.clone();
        tokio::task::spawn_blocking(move || copy_tree(&source, &destination)).await??
    };
    info!("Backup created at {destination:?} with {copied} files");
    Ok(destination)
}

/// Removes `backup_*` entries of `target` last modified more than `keep_days` before `now`.
/// Returns the removed paths; an entry that can't be removed is logged and skipped.
pub async fn cleanup_old_backups(
    target: &Path,
    keep_days: u32,
    now: DateTime<Local>,
) -> Result<Vec<PathBuf>> {
    if !tokio::fs::try_exists(target).await? {
        return Ok(vec![]);
    }
    let cutoff = now - chrono::Duration::days(i64::from(keep_days));

    let mut removed = vec![];
    let mut entries = tokio::fs::read_dir(target).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_name().to_string_lossy().starts_with(BACKUP_PREFIX) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if DateTime::<Local>::from(metadata.modified()?) >= cutoff {
            continue;
        }

        let path = entry.path();
        let result = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        match result {
            Ok(()) => {
                info!("Removed old backup {path:?}");
                removed.push(path);
            }
            Err(e) => warn!("Failed to remove old backup {path:?}: {e:?}"),
        }
    }
    Ok(removed)
}

/// Backs up a directory right away and then every `every`, pruning old backups after each
/// successful run.
pub struct BackupScheduler {
    source: PathBuf,
    target: PathBuf,
    every: Duration,
    keep_days: u32,
    shutdown: CancellationToken,
    time_provider: Box<dyn Clock>,
}

impl BackupScheduler {
    pub fn new(
        source: PathBuf,
        target: PathBuf,
        every: Duration,
        keep_days: u32,
        shutdown: CancellationToken,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            source,
            target,
            every,
            keep_days,
            shutdown,
            time_provider,
        }
    }

    async fn run_once(&self) -> Result<()> {
        let now = self.time_provider.local_time();
        backup_directory(&self.source, &self.target, now).await?;
        cleanup_old_backups(&self.target, self.keep_days, now).await?;
        Ok(())
    }

    pub async fn run(self) -> Result<()> {
        info!("Backing up {:?} every {:?}", self.source, self.every);
        let mut poll_point = self.time_provider.instant();
        loop {
            poll_point += self.every;

            if let Err(e) = self.run_once().await {
                error!("Scheduled backup failed {:?}", e);
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(poll_point) => ()
            }
        }
    }
}
