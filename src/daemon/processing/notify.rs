use std::io::Write;

use anyhow::Result;
use chrono::Local;
use tracing::{info, warn};

use crate::productivity::reminder::Triggered;

use super::module::EventProcessor;

/// Something able to get the user's attention.
#[cfg_attr(test, mockall::automock)]
pub trait Alert {
    fn alert(&mut self, headline: &str, details: &str) -> Result<()>;
}

/// Prints to stdout and rings the terminal bell.
pub struct TerminalAlert;

impl Alert for TerminalAlert {
    fn alert(&mut self, headline: &str, details: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "\n{headline}")?;
        writeln!(stdout, "{details}")?;
        // BEL
        write!(stdout, "\x07")?;
        stdout.flush()?;
        Ok(())
    }
}

/// Used by the detached daemon, which has no terminal to print to.
pub struct LogAlert;

impl Alert for LogAlert {
    fn alert(&mut self, headline: &str, details: &str) -> Result<()> {
        warn!("{headline} ({})", details.replace('\n', ", "));
        Ok(())
    }
}

/// Bridges the reminder monitor and an [Alert].
pub struct ReminderNotifier<A: Alert> {
    alert: A,
    delivered: usize,
}

impl<A: Alert> ReminderNotifier<A> {
    pub fn new(alert: A) -> Self {
        Self {
            alert,
            delivered: 0,
        }
    }
}

impl<A: Alert> EventProcessor<Triggered> for ReminderNotifier<A> {
    async fn process_next(&mut self, event: Triggered) -> Result<()> {
        let mut details = format!("Time: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        if let Some(next) = event.next {
            details.push_str(&format!("\nNext reminder: {}", next.format("%Y-%m-%d %H:%M")));
        }
        self.alert
            .alert(&format!("🔔 REMINDER: {}", event.message), &details)?;
        self.delivered += 1;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        info!("Reminder notifier delivered {} alerts", self.delivered);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use mockall::predicate::{always, eq};
    use tokio::sync::mpsc;

    use crate::{
        daemon::processing::ProcessingModule, productivity::reminder::Triggered,
        utils::logging::TEST_LOGGING,
    };

    use super::{MockAlert, ReminderNotifier};

    const TEST_DATE_TIME: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
        NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
    );

    fn triggered(message: &str) -> Triggered {
        Triggered {
            id: "1".into(),
            message: message.into(),
            scheduled_for: TEST_DATE_TIME,
            next: None,
        }
    }

    #[tokio::test]
    async fn every_event_reaches_the_alert() -> Result<()> {
        *TEST_LOGGING;
        let mut alert = MockAlert::new();
        alert
            .expect_alert()
            .with(eq("🔔 REMINDER: stretch"), always())
            .times(1)
            .returning(|_, _| Ok(()));
        alert
            .expect_alert()
            .with(eq("🔔 REMINDER: drink"), always())
            .times(1)
            .returning(|_, _| Ok(()));

        let (sender, receiver) = mpsc::channel(4);
        let module = ProcessingModule::new(receiver, ReminderNotifier::new(alert));
        sender.send(triggered("stretch")).await?;
        sender.send(triggered("drink")).await?;
        drop(sender);
        module.run().await
    }

    #[tokio::test]
    async fn failing_alert_does_not_stop_processing() -> Result<()> {
        let mut alert = MockAlert::new();
        let mut calls = 0;
        alert.expect_alert().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(anyhow!("terminal closed"))
            } else {
                Ok(())
            }
        });

        let (sender, receiver) = mpsc::channel(4);
        let module = ProcessingModule::new(receiver, ReminderNotifier::new(alert));
        sender.send(triggered("a")).await?;
        sender.send(triggered("b")).await?;
        drop(sender);
        module.run().await
    }
}
