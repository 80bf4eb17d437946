use std::path::Path;

use anyhow::Result;
use chrono::Local;
use clap::Subcommand;

use crate::{
    config::Config,
    daemon::{processing::notify::TerminalAlert, start_daemon},
    error::DaybookError,
    productivity::reminder::{
        parse_time_string, Reminder, RepeatInterval, ReminderManager, REMINDER_FILE_NAME,
    },
};

#[derive(Debug, Subcommand)]
pub enum RemindCommand {
    #[command(about = "Schedule a reminder")]
    Add {
        message: String,
        #[arg(
            short,
            long,
            help = "When to remind. Examples are \"15:30\", \"2025-03-15T09:00\", \"in 2 hours\", \"tomorrow 9:00\""
        )]
        time: String,
        #[arg(short, long, help = "Repeat every interval, e.g. 30m, 2h or 1d")]
        repeat: Option<RepeatInterval>,
    },
    #[command(about = "List active reminders")]
    List,
    #[command(about = "Remove a reminder by id")]
    Remove { id: String },
    #[command(about = "Add the stock reminders: take a break, drink water and check emails")]
    Quick,
    #[command(about = "Watch for reminders in this terminal until interrupted")]
    Watch,
}

fn describe(reminder: &Reminder) -> String {
    let mut line = format!(
        "[{}] {} at {}",
        reminder.id,
        reminder.message,
        reminder.reminder_time.format("%Y-%m-%d %H:%M")
    );
    if let Some(interval) = reminder.repeat_interval {
        line.push_str(&format!(" (every {interval})"));
    }
    line
}

pub async fn process_remind_command(
    command: RemindCommand,
    dir: &Path,
    config: &Config,
) -> Result<()> {
    let open = || ReminderManager::open(dir.join(REMINDER_FILE_NAME));
    let now = Local::now();
    match command {
        RemindCommand::Add {
            message,
            time,
            repeat,
        } => {
            let time = parse_time_string(&time, now)?;
            let id = open().await?.add(message, time, repeat, now).await?;
            println!("Reminder {id} set for {}", time.format("%Y-%m-%d %H:%M"));
        }
        RemindCommand::List => {
            let manager = open().await?;
            let active = manager.active();
            if active.is_empty() {
                println!("No active reminders");
            }
            for reminder in active {
                println!("{}", describe(reminder));
            }
        }
        RemindCommand::Remove { id } => {
            if !open().await?.remove(&id).await? {
                return Err(DaybookError::ReminderNotFound(id).into());
            }
            println!("Removed reminder {id}");
        }
        RemindCommand::Quick => {
            let ids = open().await?.add_quick(now).await?;
            println!("Added {} quick reminders", ids.len());
        }
        RemindCommand::Watch => {
            println!("Watching reminders, press Ctrl+C to stop");
            start_daemon(dir, config, TerminalAlert).await?;
        }
    }
    Ok(())
}
