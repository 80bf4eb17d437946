use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Result};
use chrono::Local;
use clap::Subcommand;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::{
    automation::{
        backup::{backup_directory, cleanup_old_backups, BackupScheduler},
        folder_monitor::{ActionRunner, FileEvent, FolderMonitor, DEFAULT_POLL_INTERVAL},
        organizer::{organize, rename_matching, OrganizeBy},
    },
    config::Config,
    daemon::{processing::ProcessingModule, shutdown::detect_shutdown},
    utils::clock::DefaultClock,
};

#[derive(Debug, Subcommand)]
pub enum FilesCommand {
    #[command(about = "Move the files of a directory into folders by extension or month")]
    Organize {
        dir: PathBuf,
        #[arg(value_enum, default_value_t = OrganizeBy::Extension)]
        by: OrganizeBy,
    },
    #[command(about = "Replace a pattern in the names of a directory's entries")]
    Rename {
        dir: PathBuf,
        old: String,
        new: String,
    },
    #[command(about = "Print changes in a directory tree until interrupted")]
    Monitor {
        dir: PathBuf,
        #[arg(
            short,
            long,
            help = "Command to run for every change. The path and created, modified or deleted are appended"
        )]
        action: Option<String>,
        #[arg(long, help = "Polling interval in milliseconds", default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
        interval_ms: u64,
    },
    #[command(about = "Copy a directory into a timestamped backup. Defaults come from the configuration")]
    Backup {
        #[arg(long)]
        source: Option<PathBuf>,
        #[arg(long)]
        target: Option<PathBuf>,
        #[arg(long, help = "Keep running and back up every N hours")]
        every_hours: Option<u32>,
        #[arg(long, help = "Remove backups older than N days")]
        keep_days: Option<u32>,
    },
}

pub async fn process_files_command(command: FilesCommand, config: &Config) -> Result<()> {
    match command {
        FilesCommand::Organize { dir, by } => {
            let report = organize(&dir, by).await?;
            for (name, folder) in &report.moved {
                println!("Moved {name} to {folder}/");
            }
            for (name, reason) in &report.failed {
                println!("❌ {name}: {reason}");
            }
            println!("Moved {} files", report.moved.len());
        }
        FilesCommand::Rename { dir, old, new } => {
            let report = rename_matching(&dir, &old, &new).await?;
            for (from, to) in &report.renamed {
                println!("Renamed: {from} -> {to}");
            }
            for (name, reason) in &report.failed {
                println!("❌ {name}: {reason}");
            }
            println!("Total files renamed: {}", report.renamed.len());
        }
        FilesCommand::Monitor {
            dir,
            action,
            interval_ms,
        } => {
            let command = action
                .map(|v| v.split_whitespace().map(String::from).collect())
                .unwrap_or_default();
            let shutdown_token = CancellationToken::new();
            let (sender, receiver) = mpsc::channel::<FileEvent>(100);
            let monitor = FolderMonitor::new(
                dir,
                sender,
                shutdown_token.clone(),
                Duration::from_millis(interval_ms.max(1)),
                Box::new(DefaultClock),
            )?;
            let processor = ProcessingModule::new(receiver, ActionRunner::new(command));

            println!("Monitoring, press Ctrl+C to stop");
            let (_, monitor_result, processing_result) = tokio::join!(
                detect_shutdown(shutdown_token.clone()),
                monitor.run(),
                processor.run(),
            );
            if let Err(e) = processing_result {
                error!("Processing module got an error {e:?}");
            }
            monitor_result?;
        }
        FilesCommand::Backup {
            source,
            target,
            every_hours,
            keep_days,
        } => {
            let source = source
                .or_else(|| config.backup.source.clone())
                .ok_or_else(|| anyhow!("No backup source given or configured"))?;
            let target = target
                .or_else(|| config.backup.target.clone())
                .ok_or_else(|| anyhow!("No backup target given or configured"))?;
            let keep_days = keep_days.unwrap_or(config.backup.keep_days);

            match every_hours {
                Some(hours) => {
                    let shutdown_token = CancellationToken::new();
                    let scheduler = BackupScheduler::new(
                        source,
                        target,
                        Duration::from_secs(u64::from(hours.max(1)) * 60 * 60),
                        keep_days,
                        shutdown_token.clone(),
                        Box::new(DefaultClock),
                    );
                    println!("Backing up every {hours} hours, press Ctrl+C to stop");
                    let (_, result) =
                        tokio::join!(detect_shutdown(shutdown_token.clone()), scheduler.run());
                    result?;
                }
                None => {
                    let now = Local::now();
                    let backup = backup_directory(&source, &target, now).await?;
                    println!("Backup created: {}", backup.display());
                    for removed in cleanup_old_backups(&target, keep_days, now).await? {
                        println!("Removed old backup: {}", removed.display());
                    }
                }
            }
        }
    }
    Ok(())
}
