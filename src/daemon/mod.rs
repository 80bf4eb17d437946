use std::{path::Path, time::Duration};

use anyhow::Result;
use monitor::ReminderMonitor;
use processing::{
    notify::{Alert, ReminderNotifier},
    ProcessingModule,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    automation::backup::BackupScheduler,
    config::{BackupConfig, Config},
    productivity::reminder::{ReminderManager, Triggered, REMINDER_FILE_NAME},
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod monitor;
pub mod processing;
pub mod shutdown;

/// Represents the starting point for the daemon. Used both by `daybook-daemon` and by
/// `daybook remind watch`, which differ only in where alerts end up.
pub async fn start_daemon(dir: &Path, config: &Config, alert: impl Alert) -> Result<()> {
    let shutdown_token = CancellationToken::new();

    let (monitor, processor) = create_reminder_pipeline(
        dir,
        Duration::from_secs(config.reminders.poll_interval_secs.max(1)),
        &shutdown_token,
        alert,
        DefaultClock,
    )
    .await?;

    let backup = create_backup_scheduler(&config.backup, &shutdown_token, DefaultClock);

    let (_, monitor_result, processing_result, backup_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        monitor.run(),
        processor.run(),
        async {
            match backup {
                Some(scheduler) => scheduler.run().await,
                None => Ok(()),
            }
        },
    );

    if let Err(monitor_result) = monitor_result {
        error!("Reminder monitor got an error {:?}", monitor_result);
    }

    if let Err(processing_result) = processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    if let Err(backup_result) = backup_result {
        error!("Backup scheduler got an error {:?}", backup_result);
    }

    Ok(())
}

async fn create_reminder_pipeline<A: Alert>(
    dir: &Path,
    poll_interval: Duration,
    shutdown_token: &CancellationToken,
    alert: A,
    clock: impl Clock,
) -> Result<(
    ReminderMonitor,
    ProcessingModule<Triggered, ReminderNotifier<A>>,
)> {
    let (sender, receiver) = mpsc::channel::<Triggered>(10);
    let manager = ReminderManager::open(dir.join(REMINDER_FILE_NAME)).await?;
    let monitor = ReminderMonitor::new(
        sender,
        manager,
        shutdown_token.clone(),
        poll_interval,
        Box::new(clock),
    );
    let processor = ProcessingModule::new(receiver, ReminderNotifier::new(alert));
    Ok((monitor, processor))
}

fn create_backup_scheduler(
    config: &BackupConfig,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> Option<BackupScheduler> {
    let (Some(source), Some(target)) = (&config.source, &config.target) else {
        return None;
    };
    info!("Scheduling backups of {source:?} into {target:?}");
    Some(BackupScheduler::new(
        source.clone(),
        target.clone(),
        Duration::from_secs(u64::from(config.every_hours.max(1)) * 60 * 60),
        config.keep_days,
        shutdown_token.clone(),
        Box::new(clock),
    ))
}
