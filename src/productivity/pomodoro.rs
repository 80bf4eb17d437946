use std::{fmt::Display, path::PathBuf, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{config::PomodoroConfig, store::json_store::JsonStore, utils::clock::Clock};

pub const POMODORO_STATS_FILE_NAME: &str = "pomodoro_stats.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Work,
    ShortBreak,
    LongBreak,
}

impl Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::Work => write!(f, "Work"),
            SessionKind::ShortBreak => write!(f, "Short break"),
            SessionKind::LongBreak => write!(f, "Long break"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    /// Cancelled before the countdown reached zero. Nothing should be recorded.
    Stopped { remaining_secs: u64 },
}

/// Handles a running session listens to. `paused` holds `true` while the countdown is suspended.
pub struct SessionControl {
    pub shutdown: CancellationToken,
    pub paused: watch::Receiver<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PomodoroTimer {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub long_break_every: u32,
}

impl From<&PomodoroConfig> for PomodoroTimer {
    fn from(value: &PomodoroConfig) -> Self {
        Self {
            work_minutes: value.work_minutes,
            short_break_minutes: value.break_minutes,
            long_break_minutes: value.long_break_minutes,
            long_break_every: value.long_break_every,
        }
    }
}

impl PomodoroTimer {
    pub fn minutes(&self, kind: SessionKind) -> u32 {
        match kind {
            SessionKind::Work => self.work_minutes,
            SessionKind::ShortBreak => self.short_break_minutes,
            SessionKind::LongBreak => self.long_break_minutes,
        }
    }

    /// Every `long_break_every`-th completed work session earns a long break.
    pub fn next_break(&self, completed_today: usize) -> SessionKind {
        let every = self.long_break_every.max(1) as usize;
        if completed_today > 0 && completed_today % every == 0 {
            SessionKind::LongBreak
        } else {
            SessionKind::ShortBreak
        }
    }

    /// Counts a session down one second at a time, calling `on_tick` with the remaining seconds
    /// (starting at the full length and ending at 0). A pause takes effect on the next tick.
    pub async fn run_session(
        &self,
        kind: SessionKind,
        clock: &dyn Clock,
        mut control: SessionControl,
        mut on_tick: impl FnMut(u64),
    ) -> SessionOutcome {
        let mut remaining = u64::from(self.minutes(kind)) * 60;
        info!("Starting {kind} session of {remaining}s");
        loop {
            let is_paused = *control.paused.borrow_and_update();
            if is_paused {
                debug!("Session paused with {remaining}s left");
                tokio::select! {
                    _ = control.shutdown.cancelled() => {
                        return SessionOutcome::Stopped { remaining_secs: remaining };
                    }
                    resumed = control.paused.wait_for(|paused| !*paused) => {
                        // Nobody can resume a session whose controller is gone.
                        if resumed.is_err() {
                            return SessionOutcome::Stopped { remaining_secs: remaining };
                        }
                    }
                }
                continue;
            }

            on_tick(remaining);
            if remaining == 0 {
                info!("{kind} session completed");
                return SessionOutcome::Completed;
            }

            tokio::select! {
                _ = control.shutdown.cancelled() => {
                    info!("{kind} session stopped with {remaining}s left");
                    return SessionOutcome::Stopped { remaining_secs: remaining };
                }
                _ = clock.sleep(Duration::from_secs(1)) => remaining -= 1,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub date: NaiveDate,
    pub kind: SessionKind,
    pub minutes: u32,
    pub completed_at: NaiveDateTime,
}

/// Completed sessions, kept in [POMODORO_STATS_FILE_NAME].
pub struct PomodoroStats {
    store: JsonStore<SessionRecord>,
    sessions: Vec<SessionRecord>,
}

impl PomodoroStats {
    pub async fn open(path: PathBuf) -> Result<Self> {
        let store = JsonStore::new(path);
        let sessions = store.load().await?;
        Ok(Self { store, sessions })
    }

    pub async fn record(
        &mut self,
        kind: SessionKind,
        minutes: u32,
        now: DateTime<Local>,
    ) -> Result<()> {
        self.sessions.push(SessionRecord {
            date: now.date_naive(),
            kind,
            minutes,
            completed_at: now.naive_local(),
        });
        self.store.save(&self.sessions).await
    }

    pub fn today(&self, date: NaiveDate) -> Vec<&SessionRecord> {
        self.sessions.iter().filter(|s| s.date == date).collect()
    }

    pub fn completed_work(&self, date: NaiveDate) -> usize {
        self.today(date)
            .into_iter()
            .filter(|s| s.kind == SessionKind::Work)
            .count()
    }

    pub fn total_work_minutes(&self, date: NaiveDate) -> u32 {
        self.today(date)
            .into_iter()
            .filter(|s| s.kind == SessionKind::Work)
            .map(|s| s.minutes)
            .sum()
    }

    /// Drops the sessions of `date` and returns how many were removed.
    pub async fn reset(&mut self, date: NaiveDate) -> Result<usize> {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.date != date);
        let removed = before - self.sessions.len();
        if removed > 0 {
            self.store.save(&self.sessions).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
    use tempfile::tempdir;
    use tokio::{sync::watch, time::Instant};
    use tokio_util::sync::CancellationToken;

    use crate::{config::PomodoroConfig, utils::clock::DefaultClock};

    use super::{
        PomodoroStats, PomodoroTimer, SessionControl, SessionKind, SessionOutcome,
        POMODORO_STATS_FILE_NAME,
    };

    const TEST_DATE_TIME: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
    );

    fn now() -> DateTime<Local> {
        Local.from_local_datetime(&TEST_DATE_TIME).unwrap()
    }

    fn one_minute_timer() -> PomodoroTimer {
        PomodoroTimer {
            work_minutes: 1,
            short_break_minutes: 1,
            long_break_minutes: 2,
            long_break_every: 4,
        }
    }

    #[test]
    fn every_fourth_break_is_long() {
        let timer = PomodoroTimer::from(&PomodoroConfig::default());
        assert_eq!(timer.minutes(SessionKind::Work), 25);
        assert_eq!(timer.next_break(0), SessionKind::ShortBreak);
        assert_eq!(timer.next_break(3), SessionKind::ShortBreak);
        assert_eq!(timer.next_break(4), SessionKind::LongBreak);
        assert_eq!(timer.next_break(8), SessionKind::LongBreak);
    }

    #[tokio::test(start_paused = true)]
    async fn session_ticks_down_to_zero() {
        let (_pause, paused) = watch::channel(false);
        let control = SessionControl {
            shutdown: CancellationToken::new(),
            paused,
        };
        let mut ticks = vec![];
        let started = Instant::now();
        let outcome = one_minute_timer()
            .run_session(SessionKind::Work, &DefaultClock, control, |v| ticks.push(v))
            .await;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(ticks.len(), 61);
        assert_eq!(ticks.first(), Some(&60));
        assert_eq!(ticks.last(), Some(&0));
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(started.elapsed() < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_suspends_the_countdown() -> Result<()> {
        let (pause, paused) = watch::channel(false);
        let control = SessionControl {
            shutdown: CancellationToken::new(),
            paused,
        };
        let timer = one_minute_timer();
        let started = Instant::now();

        let (outcome, toggled) = tokio::join!(
            timer.run_session(SessionKind::Work, &DefaultClock, control, |_| ()),
            async {
                tokio::time::sleep(Duration::from_millis(10_500)).await;
                pause.send(true)?;
                tokio::time::sleep(Duration::from_secs(100)).await;
                pause.send(false)?;
                anyhow::Ok(())
            }
        );
        toggled?;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert!(started.elapsed() >= Duration::from_secs(150));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_session_is_stopped() {
        let (_pause, paused) = watch::channel(false);
        let shutdown = CancellationToken::new();
        let control = SessionControl {
            shutdown: shutdown.clone(),
            paused,
        };

        let timer = one_minute_timer();
        let (outcome, _) = tokio::join!(
            timer.run_session(SessionKind::ShortBreak, &DefaultClock, control, |_| ()),
            async {
                tokio::time::sleep(Duration::from_millis(5_500)).await;
                shutdown.cancel();
            }
        );
        assert_eq!(outcome, SessionOutcome::Stopped { remaining_secs: 55 });
    }

    #[tokio::test]
    async fn stats_track_todays_work() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(POMODORO_STATS_FILE_NAME);
        let mut stats = PomodoroStats::open(path.clone()).await?;
        stats.record(SessionKind::Work, 25, now()).await?;
        stats.record(SessionKind::ShortBreak, 5, now()).await?;
        stats.record(SessionKind::Work, 25, now()).await?;

        let reopened = PomodoroStats::open(path.clone()).await?;
        let today = TEST_DATE_TIME.date();
        assert_eq!(reopened.today(today).len(), 3);
        assert_eq!(reopened.completed_work(today), 2);
        assert_eq!(reopened.total_work_minutes(today), 50);

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(raw[1]["kind"], "short_break");

        let mut stats = reopened;
        assert_eq!(stats.reset(today).await?, 3);
        assert!(stats.today(today).is_empty());
        Ok(())
    }
}
