use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::{
    productivity::reminder::{ReminderManager, Triggered},
    utils::clock::Clock,
};

/// Polls the reminder store and forwards every reminder that fired.
pub struct ReminderMonitor {
    next: mpsc::Sender<Triggered>,
    manager: ReminderManager,
    shutdown: CancellationToken,
    poll_interval: Duration,
    time_provider: Box<dyn Clock>,
}

impl ReminderMonitor {
    pub fn new(
        next: mpsc::Sender<Triggered>,
        manager: ReminderManager,
        shutdown: CancellationToken,
        poll_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            manager,
            shutdown,
            poll_interval,
            time_provider,
        }
    }

    async fn poll(&mut self) -> Result<Vec<Triggered>> {
        self.manager.reload().await?;
        let now = self.time_provider.local_time().naive_local();
        self.manager.check(now).await
    }

    /// Executes the polling loop until the shutdown token is cancelled.
    pub async fn run(mut self) -> Result<()> {
        info!("Watching reminders every {:?}", self.poll_interval);
        let mut poll_point = self.time_provider.instant();
        loop {
            poll_point += self.poll_interval;

            match self.poll().await {
                Ok(triggered) => {
                    for reminder in triggered {
                        let span = info_span!("Forwarding triggered reminder");
                        debug!("Sending reminder {:?}", reminder);
                        self.next
                            .send(reminder)
                            .instrument(span)
                            .await
                            .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
                    }
                }
                // A half-written store shouldn't kill the loop, the next poll will retry.
                Err(e) => error!("Encountered an error while checking reminders {:?}", e),
            }

            tokio::select! {
                // Dropping self afterwards closes the channel and stops the processing module.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(poll_point) => ()
            }
        }
    }
}
