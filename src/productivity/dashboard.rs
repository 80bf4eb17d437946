use std::{fmt::Display, future::Future, path::Path};

use anyhow::Result;
use chrono::{DateTime, Local};
use tracing::warn;

use crate::utils::time::{format_clock_duration, from_epoch_seconds};

use super::{
    expenses::{ExpenseTracker, Period, EXPENSES_FILE_NAME},
    pomodoro::{PomodoroStats, POMODORO_STATS_FILE_NAME},
    reminder::{ReminderManager, ReminderSummary, REMINDER_FILE_NAME},
    todo::{TodoManager, TodoSummary, TODO_FILE_NAME},
    tracker::{Activity, TimeTracker},
};

#[derive(Debug, PartialEq)]
pub struct TrackingOverview {
    pub tracked_today: f64,
    pub current: Option<Activity>,
    pub last: Option<Activity>,
}

#[derive(Debug, PartialEq)]
pub struct PomodoroOverview {
    pub sessions: usize,
    pub work_minutes: u32,
}

/// Everything the dashboard shows. A section is `None` when its store couldn't be read.
#[derive(Debug)]
pub struct Dashboard {
    pub generated_at: DateTime<Local>,
    pub todos: Option<TodoSummary>,
    pub reminders: Option<ReminderSummary>,
    pub tracking: Option<TrackingOverview>,
    pub pomodoro: Option<PomodoroOverview>,
    pub month_expenses: Option<f64>,
}

async fn section<T>(name: &str, collect: impl Future<Output = Result<T>>) -> Option<T> {
    collect
        .await
        .inspect_err(|e| warn!("Dashboard section {name} is unavailable {e:?}"))
        .ok()
}

impl Dashboard {
    pub async fn collect(dir: &Path, now: DateTime<Local>) -> Dashboard {
        let today = now.date_naive();
        Dashboard {
            generated_at: now,
            todos: section("todo", async {
                Ok(TodoManager::open(dir.join(TODO_FILE_NAME)).await?.summary())
            })
            .await,
            reminders: section("reminders", async {
                Ok(ReminderManager::open(dir.join(REMINDER_FILE_NAME))
                    .await?
                    .summary())
            })
            .await,
            tracking: section("tracking", async {
                let tracker = TimeTracker::open(dir).await?;
                let daily = tracker.daily_summary(today);
                Ok(TrackingOverview {
                    tracked_today: daily.total,
                    current: tracker.current().cloned(),
                    last: tracker.activities().last().cloned(),
                })
            })
            .await,
            pomodoro: section("pomodoro", async {
                let stats = PomodoroStats::open(dir.join(POMODORO_STATS_FILE_NAME)).await?;
                Ok(PomodoroOverview {
                    sessions: stats.completed_work(today),
                    work_minutes: stats.total_work_minutes(today),
                })
            })
            .await,
            month_expenses: section("expenses", async {
                let summary = ExpenseTracker::new(dir.join(EXPENSES_FILE_NAME))
                    .summarize(Period::Month, today)
                    .await?;
                Ok(summary.total)
            })
            .await,
        }
    }
}

const UNAVAILABLE: &str = "  unavailable";

impl Display for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "📊 Daybook for {}",
            self.generated_at.format("%A, %Y-%m-%d %H:%M")
        )?;

        writeln!(f, "\n📝 Todos")?;
        match &self.todos {
            Some(todos) if todos.total == 0 => writeln!(f, "  No todos")?,
            Some(todos) => {
                writeln!(f, "  {} pending of {}", todos.pending, todos.total)?;
                if let Some(next) = &todos.next_due {
                    if let Some(due) = next.due_date {
                        writeln!(f, "  Next due: {} ({due})", next.task)?;
                    }
                }
            }
            None => writeln!(f, "{UNAVAILABLE}")?,
        }

        writeln!(f, "\n🔔 Reminders")?;
        match &self.reminders {
            Some(reminders) if reminders.active == 0 => writeln!(f, "  No active reminders")?,
            Some(reminders) => {
                writeln!(f, "  {} active", reminders.active)?;
                if let Some(next) = &reminders.next {
                    writeln!(
                        f,
                        "  Next: {} at {}",
                        next.message,
                        next.reminder_time.format("%Y-%m-%d %H:%M")
                    )?;
                }
            }
            None => writeln!(f, "{UNAVAILABLE}")?,
        }

        writeln!(f, "\n⏱️ Time tracking")?;
        match &self.tracking {
            Some(tracking) => {
                writeln!(
                    f,
                    "  Tracked today: {}",
                    format_clock_duration(tracking.tracked_today)
                )?;
                match (&tracking.current, &tracking.last) {
                    (Some(current), _) => writeln!(
                        f,
                        "  Currently: {} [{}] since {}",
                        current.name,
                        current.category,
                        from_epoch_seconds(current.start_time)
                            .map(|v| v.format("%H:%M").to_string())
                            .unwrap_or_default()
                    )?,
                    (None, Some(last)) => writeln!(
                        f,
                        "  Last activity: {} [{}], {}",
                        last.name,
                        last.category,
                        format_clock_duration(last.duration)
                    )?,
                    (None, None) => writeln!(f, "  No activities yet")?,
                }
            }
            None => writeln!(f, "{UNAVAILABLE}")?,
        }

        writeln!(f, "\n🍅 Pomodoro")?;
        match &self.pomodoro {
            Some(pomodoro) => writeln!(
                f,
                "  {} sessions today, {} minutes of focus",
                pomodoro.sessions, pomodoro.work_minutes
            )?,
            None => writeln!(f, "{UNAVAILABLE}")?,
        }

        writeln!(f, "\n💰 Expenses")?;
        match self.month_expenses {
            Some(total) => write!(f, "  This month: {total:.2}")?,
            None => write!(f, "{UNAVAILABLE}")?,
        }
        Ok(())
    }
}
