use std::{fmt::Display, path::PathBuf, str::FromStr};

use anyhow::Result;
use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime};
use chrono_english::{parse_date_string, Dialect};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{error::DaybookError, store::json_store::JsonStore};

pub const REMINDER_FILE_NAME: &str = "reminders.json";
/// Longest repeat interval accepted from text, ten years.
const MAX_INTERVAL_MINUTES: u64 = 10 * 365 * 24 * 60;

/// How far a repeating reminder moves after it fires. Written as `30m`, `2h` or `1d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RepeatInterval {
    Minutes(u32),
    Hours(u32),
    Days(u32),
}

impl RepeatInterval {
    fn minutes(&self) -> u64 {
        match *self {
            RepeatInterval::Minutes(v) => u64::from(v),
            RepeatInterval::Hours(v) => u64::from(v) * 60,
            RepeatInterval::Days(v) => u64::from(v) * 24 * 60,
        }
    }

    pub fn as_duration(&self) -> Duration {
        match *self {
            RepeatInterval::Minutes(v) => Duration::minutes(v as i64),
            RepeatInterval::Hours(v) => Duration::hours(v as i64),
            RepeatInterval::Days(v) => Duration::days(v as i64),
        }
    }
}

impl Display for RepeatInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepeatInterval::Minutes(v) => write!(f, "{v}m"),
            RepeatInterval::Hours(v) => write!(f, "{v}h"),
            RepeatInterval::Days(v) => write!(f, "{v}d"),
        }
    }
}

impl FromStr for RepeatInterval {
    type Err = DaybookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DaybookError::InvalidInterval(s.to_string());
        let trimmed = s.trim();
        if trimmed.len() < 2 || !trimmed.is_char_boundary(trimmed.len() - 1) {
            return Err(invalid());
        }
        let (amount, unit) = trimmed.split_at(trimmed.len() - 1);
        let amount = amount.parse::<u32>().map_err(|_| invalid())?;
        if amount == 0 {
            return Err(invalid());
        }
        let interval = match unit {
            "m" => RepeatInterval::Minutes(amount),
            "h" => RepeatInterval::Hours(amount),
            "d" => RepeatInterval::Days(amount),
            _ => return Err(invalid()),
        };
        if interval.minutes() > MAX_INTERVAL_MINUTES {
            return Err(invalid());
        }
        Ok(interval)
    }
}

impl From<RepeatInterval> for String {
    fn from(value: RepeatInterval) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for RepeatInterval {
    type Error = DaybookError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    /// Creation time in epoch milliseconds, bumped when it collides with an existing id.
    pub id: String,
    pub message: String,
    pub reminder_time: NaiveDateTime,
    pub repeat: bool,
    pub repeat_interval: Option<RepeatInterval>,
    pub active: bool,
}

/// A reminder that fired during [ReminderManager::check].
#[derive(Debug, Clone, PartialEq)]
pub struct Triggered {
    pub id: String,
    pub message: String,
    pub scheduled_for: NaiveDateTime,
    /// Next trigger time for repeating reminders, `None` when the reminder got deactivated.
    pub next: Option<NaiveDateTime>,
}

#[derive(Debug, PartialEq)]
pub struct ReminderSummary {
    pub active: usize,
    pub next: Option<Reminder>,
}

pub struct ReminderManager {
    store: JsonStore<Reminder>,
    reminders: Vec<Reminder>,
}

impl ReminderManager {
    pub async fn open(path: PathBuf) -> Result<Self> {
        let store = JsonStore::new(path);
        let reminders = store.load().await?;
        Ok(Self { store, reminders })
    }

    /// Re-reads the store. The monitor calls it on every poll so that reminders added from
    /// another process are picked up.
    pub async fn reload(&mut self) -> Result<()> {
        self.reminders = self.store.load().await?;
        Ok(())
    }

    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    pub async fn add(
        &mut self,
        message: String,
        reminder_time: NaiveDateTime,
        repeat_interval: Option<RepeatInterval>,
        now: DateTime<Local>,
    ) -> Result<String> {
        let id = self.unique_id(now.timestamp_millis());
        info!("Adding reminder {id} {message:?} at {reminder_time}");
        self.reminders.push(Reminder {
            id: id.clone(),
            message,
            reminder_time,
            repeat: repeat_interval.is_some(),
            repeat_interval,
            active: true,
        });
        self.store.save(&self.reminders).await?;
        Ok(id)
    }

    fn unique_id(&self, mut millis: i64) -> String {
        while self.reminders.iter().any(|r| r.id == millis.to_string()) {
            millis += 1;
        }
        millis.to_string()
    }

    /// Returns false when there was no reminder with the id.
    pub async fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.reminders.len();
        self.reminders.retain(|r| r.id != id);
        if self.reminders.len() == before {
            return Ok(false);
        }
        self.store.save(&self.reminders).await?;
        Ok(true)
    }

    pub fn active(&self) -> Vec<&Reminder> {
        self.reminders.iter().filter(|r| r.active).collect()
    }

    /// Fires every active reminder that is due. Repeating reminders move forward by exactly one
    /// interval, others are deactivated. Missed intervals are not caught up in one go.
    pub async fn check(&mut self, now: NaiveDateTime) -> Result<Vec<Triggered>> {
        let mut triggered = vec![];
        for reminder in self.reminders.iter_mut() {
            if !reminder.active || reminder.reminder_time > now {
                continue;
            }
            let scheduled_for = reminder.reminder_time;
            let rescheduled = match (reminder.repeat, reminder.repeat_interval) {
                (true, Some(interval)) => {
                    let rescheduled = reminder
                        .reminder_time
                        .checked_add_signed(interval.as_duration());
                    if rescheduled.is_none() {
                        warn!(
                            "Reminder {} can't repeat after {interval}, deactivating",
                            reminder.id
                        );
                    }
                    rescheduled
                }
                _ => None,
            };
            let next = match rescheduled {
                Some(time) => {
                    reminder.reminder_time = time;
                    Some(time)
                }
                None => {
                    reminder.active = false;
                    None
                }
            };
            debug!("Reminder {} fired, next {next:?}", reminder.id);
            triggered.push(Triggered {
                id: reminder.id.clone(),
                message: reminder.message.clone(),
                scheduled_for,
                next,
            });
        }

        if !triggered.is_empty() {
            self.store.save(&self.reminders).await?;
        }
        Ok(triggered)
    }

    /// Creates the three stock reminders.
    pub async fn add_quick(&mut self, now: DateTime<Local>) -> Result<Vec<String>> {
        let base = now.naive_local();
        let quick = [
            ("Take a break", base + Duration::hours(1), None),
            (
                "Drink water",
                base + Duration::minutes(30),
                Some(RepeatInterval::Minutes(30)),
            ),
            ("Check emails", base + Duration::hours(2), None),
        ];
        let mut ids = vec![];
        for (message, time, interval) in quick {
            ids.push(self.add(message.into(), time, interval, now).await?);
        }
        Ok(ids)
    }

    pub fn summary(&self) -> ReminderSummary {
        let active = self.active();
        ReminderSummary {
            active: active.len(),
            next: active
                .into_iter()
                .min_by_key(|r| r.reminder_time)
                .cloned(),
        }
    }
}

/// Parses a trigger time. `HH:MM` means today, or tomorrow when the time already passed.
/// `YYYY-MM-DDTHH:MM[:SS]` is taken as is. Anything else goes through natural language parsing,
/// e.g. "in 2 hours" or "tomorrow 9:00".
pub fn parse_time_string(text: &str, now: DateTime<Local>) -> Result<NaiveDateTime> {
    let text = text.trim();
    let invalid = || DaybookError::InvalidTime(text.to_string());

    if text.contains('T') {
        return ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .into_iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .ok_or_else(|| invalid().into());
    }

    if let Ok(time) = NaiveTime::parse_from_str(text, "%H:%M") {
        let mut moment = now.date_naive().and_time(time);
        if moment < now.naive_local() {
            moment += Duration::days(1);
        }
        return Ok(moment);
    }

    parse_date_string(text, now, Dialect::Uk)
        .map(|v| v.naive_local())
        .map_err(|_| invalid().into())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
    use tempfile::tempdir;

    use crate::error::DaybookError;

    use super::{parse_time_string, RepeatInterval, ReminderManager, REMINDER_FILE_NAME};

    const TEST_DATE_TIME: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
        NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
    );

    fn now() -> DateTime<Local> {
        Local.from_local_datetime(&TEST_DATE_TIME).unwrap()
    }

    #[test]
    fn interval_parsing() {
        assert_eq!("30m".parse::<RepeatInterval>().unwrap(), RepeatInterval::Minutes(30));
        assert_eq!("2h".parse::<RepeatInterval>().unwrap(), RepeatInterval::Hours(2));
        assert_eq!("1d".parse::<RepeatInterval>().unwrap(), RepeatInterval::Days(1));
        assert!(matches!(
            "5w".parse::<RepeatInterval>(),
            Err(DaybookError::InvalidInterval(_))
        ));
        assert!("m".parse::<RepeatInterval>().is_err());
        assert!("0h".parse::<RepeatInterval>().is_err());
        assert!("3650d".parse::<RepeatInterval>().is_ok());
        assert!(matches!(
            "100000000d".parse::<RepeatInterval>(),
            Err(DaybookError::InvalidInterval(_))
        ));
    }

    #[test]
    fn time_parsing() -> Result<()> {
        let later_today = parse_time_string("15:30", now())?;
        assert_eq!(later_today, TEST_DATE_TIME.date().and_hms_opt(15, 30, 0).unwrap());

        let passed = parse_time_string("09:00", now())?;
        assert_eq!(
            passed,
            TEST_DATE_TIME.date().succ_opt().unwrap().and_hms_opt(9, 0, 0).unwrap()
        );

        let explicit = parse_time_string("2024-05-01T08:15", now())?;
        assert_eq!(
            explicit,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(8, 15, 0).unwrap()
        );

        assert!(parse_time_string("2024-05-01Tnope", now()).is_err());
        assert!(parse_time_string("definitely not a time", now()).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn one_shot_reminder_deactivates() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(REMINDER_FILE_NAME);
        let mut manager = ReminderManager::open(path.clone()).await?;
        manager
            .add("stretch".into(), TEST_DATE_TIME, None, now())
            .await?;

        assert!(manager
            .check(TEST_DATE_TIME - Duration::seconds(1))
            .await?
            .is_empty());

        let fired = manager.check(TEST_DATE_TIME).await?;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].next, None);

        let reopened = ReminderManager::open(path).await?;
        assert!(reopened.active().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn repeating_reminder_moves_by_one_interval() -> Result<()> {
        let dir = tempdir()?;
        let mut manager = ReminderManager::open(dir.path().join(REMINDER_FILE_NAME)).await?;
        manager
            .add(
                "water".into(),
                TEST_DATE_TIME,
                Some(RepeatInterval::Minutes(30)),
                now(),
            )
            .await?;

        // Three hours late: the reminder still only moves forward by a single interval.
        let fired = manager.check(TEST_DATE_TIME + Duration::hours(3)).await?;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].next, Some(TEST_DATE_TIME + Duration::minutes(30)));
        assert!(manager.reminders()[0].active);
        assert!(manager.reminders()[0].repeat);
        Ok(())
    }

    #[tokio::test]
    async fn repeat_past_calendar_end_deactivates() -> Result<()> {
        let dir = tempdir()?;
        let mut manager = ReminderManager::open(dir.path().join(REMINDER_FILE_NAME)).await?;
        manager
            .add(
                "someday".into(),
                TEST_DATE_TIME,
                Some(RepeatInterval::Days(u32::MAX)),
                now(),
            )
            .await?;

        let fired = manager.check(TEST_DATE_TIME).await?;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].next, None);
        assert!(manager.active().is_empty());
        assert_eq!(manager.reminders()[0].reminder_time, TEST_DATE_TIME);
        Ok(())
    }

    #[tokio::test]
    async fn quick_reminders_get_distinct_ids() -> Result<()> {
        let dir = tempdir()?;
        let mut manager = ReminderManager::open(dir.path().join(REMINDER_FILE_NAME)).await?;
        let ids = manager.add_quick(now()).await?;
        assert_eq!(ids.len(), 3);
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);

        let summary = manager.summary();
        assert_eq!(summary.active, 3);
        assert_eq!(summary.next.map(|r| r.message), Some("Drink water".into()));
        Ok(())
    }

    #[tokio::test]
    async fn remove_by_id() -> Result<()> {
        let dir = tempdir()?;
        let mut manager = ReminderManager::open(dir.path().join(REMINDER_FILE_NAME)).await?;
        let id = manager
            .add("call".into(), TEST_DATE_TIME, None, now())
            .await?;
        assert!(!manager.remove("unknown").await?);
        assert!(manager.remove(&id).await?);
        assert!(manager.reminders().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn interval_is_stored_as_text() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(REMINDER_FILE_NAME);
        let mut manager = ReminderManager::open(path.clone()).await?;
        manager
            .add("a".into(), TEST_DATE_TIME, Some(RepeatInterval::Hours(2)), now())
            .await?;
        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        assert_eq!(raw[0]["repeat_interval"], "2h");
        assert_eq!(raw[0]["repeat"], true);
        Ok(())
    }
}
