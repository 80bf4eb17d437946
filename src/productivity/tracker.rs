use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Duration, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    store::json_store::{read_json_file, write_json_file, JsonStore},
    utils::{
        percentage::{share_percentage, Percentage},
        time::epoch_seconds,
    },
};

pub const TRACKING_FILE_NAME: &str = "time_tracking.json";
/// Holds the open activity between invocations, `null` when nothing is tracked.
pub const CURRENT_ACTIVITY_FILE_NAME: &str = "time_tracking_current.json";
pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    pub category: String,
    /// Epoch seconds.
    pub start_time: f64,
    pub end_time: Option<f64>,
    /// Seconds, zero while the activity is open.
    pub duration: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryShare {
    pub category: String,
    pub seconds: f64,
    pub share: Percentage,
}

#[derive(Debug, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub activities: Vec<Activity>,
    pub categories: Vec<CategoryShare>,
    pub total: f64,
}

#[derive(Debug, PartialEq)]
pub struct WeeklySummary {
    pub week_start: NaiveDate,
    /// Monday through Sunday.
    pub days: Vec<(NaiveDate, f64)>,
    pub categories: Vec<CategoryShare>,
    pub total: f64,
}

#[derive(Debug, PartialEq)]
pub struct Report {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Hours per category, largest first.
    pub category_hours: Vec<(String, f64)>,
    /// Hours per day in date order, only days with tracked time.
    pub daily_hours: Vec<(NaiveDate, f64)>,
    pub total_hours: f64,
}

/// Tracks one activity at a time. Finished activities go into [TRACKING_FILE_NAME].
pub struct TimeTracker {
    store: JsonStore<Activity>,
    current_path: PathBuf,
    activities: Vec<Activity>,
    current: Option<Activity>,
}

impl TimeTracker {
    pub async fn open(dir: &Path) -> Result<Self> {
        let store = JsonStore::new(dir.join(TRACKING_FILE_NAME));
        let activities = store.load().await?;
        let current_path = dir.join(CURRENT_ACTIVITY_FILE_NAME);
        let current = read_json_file::<Option<Activity>>(&current_path)
            .await?
            .flatten();
        Ok(Self {
            store,
            current_path,
            activities,
            current,
        })
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn current(&self) -> Option<&Activity> {
        self.current.as_ref()
    }

    /// Starts a new activity, finishing the open one first.
    pub async fn start(
        &mut self,
        name: String,
        category: Option<String>,
        now: DateTime<Local>,
    ) -> Result<&Activity> {
        if self.current.is_some() {
            self.stop(now).await?;
        }
        let category = category
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        info!("Starting activity {name:?} in {category:?}");

        let activity = self.current.insert(Activity {
            name,
            category,
            start_time: epoch_seconds(&now),
            end_time: None,
            duration: 0.,
            date: now.date_naive(),
        });
        write_json_file(&self.current_path, &Some(&*activity)).await?;
        Ok(activity)
    }

    /// Finishes the open activity and returns its duration in seconds. Nothing open means 0.
    pub async fn stop(&mut self, now: DateTime<Local>) -> Result<f64> {
        let Some(mut activity) = self.current.take() else {
            return Ok(0.);
        };
        let end_time = epoch_seconds(&now);
        activity.end_time = Some(end_time);
        activity.duration = (end_time - activity.start_time).max(0.);
        let duration = activity.duration;
        debug!("Stopping activity {:?} after {duration}s", activity.name);

        if duration > 0. {
            self.activities.push(activity);
            self.store.save(&self.activities).await?;
        }
        write_json_file(&self.current_path, &None::<Activity>).await?;
        Ok(duration)
    }

    fn on(&self, date: NaiveDate) -> impl Iterator<Item = &Activity> {
        self.activities.iter().filter(move |a| a.date == date)
    }

    pub fn daily_summary(&self, date: NaiveDate) -> DailySummary {
        let activities = self.on(date).cloned().collect::<Vec<_>>();
        let (categories, total) = category_shares(activities.iter());
        DailySummary {
            date,
            activities,
            categories,
            total,
        }
    }

    pub fn weekly_summary(&self, today: NaiveDate) -> WeeklySummary {
        let week_start = today.week(Weekday::Mon).first_day();
        let days = (0..7)
            .map(|offset| week_start + Duration::days(offset))
            .map(|day| (day, self.on(day).fold(0., |total, a| total + a.duration)))
            .collect::<Vec<_>>();
        let week_end = week_start + Duration::days(6);
        let (categories, total) = category_shares(
            self.activities
                .iter()
                .filter(|a| a.date >= week_start && a.date <= week_end),
        );
        WeeklySummary {
            week_start,
            days,
            categories,
            total,
        }
    }

    /// Hours over the last `days` days, `today` included.
    pub fn report(&self, days: u32, today: NaiveDate) -> Report {
        let start = today - Duration::days(i64::from(days.max(1)) - 1);
        let in_range = || {
            self.activities
                .iter()
                .filter(move |a| a.date >= start && a.date <= today)
        };

        let mut daily = BTreeMap::<NaiveDate, f64>::new();
        for activity in in_range() {
            *daily.entry(activity.date).or_default() += activity.duration / 3600.;
        }
        let (categories, total) = category_shares(in_range());

        Report {
            start,
            end: today,
            category_hours: categories
                .into_iter()
                .map(|v| (v.category, v.seconds / 3600.))
                .collect(),
            daily_hours: daily.into_iter().collect(),
            total_hours: total / 3600.,
        }
    }

    pub fn categories(&self) -> Vec<String> {
        self.activities
            .iter()
            .map(|a| a.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Per-category totals sorted by time spent, plus the overall total.
fn category_shares<'a>(activities: impl Iterator<Item = &'a Activity>) -> (Vec<CategoryShare>, f64) {
    let mut totals = BTreeMap::<&str, f64>::new();
    for activity in activities {
        *totals.entry(activity.category.as_str()).or_default() += activity.duration;
    }
    let total = totals.values().fold(0., |total, v| total + v);
    let mut shares = totals
        .into_iter()
        .map(|(category, seconds)| CategoryShare {
            category: category.to_string(),
            seconds,
            share: share_percentage(seconds, total),
        })
        .collect::<Vec<_>>();
    shares.sort_by(|a, b| b.seconds.total_cmp(&a.seconds));
    (shares, total)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
    use tempfile::tempdir;

    use super::{TimeTracker, CURRENT_ACTIVITY_FILE_NAME, DEFAULT_CATEGORY};

    // A Wednesday.
    const TEST_DATE_TIME: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
    );

    fn at(offset: Duration) -> DateTime<Local> {
        Local.from_local_datetime(&(TEST_DATE_TIME + offset)).unwrap()
    }

    #[tokio::test]
    async fn stopping_without_start_returns_zero() -> Result<()> {
        let dir = tempdir()?;
        let mut tracker = TimeTracker::open(dir.path()).await?;
        assert_eq!(tracker.stop(at(Duration::zero())).await?, 0.);
        assert!(tracker.activities().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn open_activity_survives_reopening() -> Result<()> {
        let dir = tempdir()?;
        let mut tracker = TimeTracker::open(dir.path()).await?;
        tracker
            .start("coding".into(), Some(" Work ".into()), at(Duration::zero()))
            .await?;

        let mut reopened = TimeTracker::open(dir.path()).await?;
        assert_eq!(reopened.current().map(|a| a.category.as_str()), Some("Work"));
        let duration = reopened.stop(at(Duration::minutes(90))).await?;
        assert_eq!(duration, 90. * 60.);
        assert_eq!(reopened.activities().len(), 1);
        assert_eq!(reopened.activities()[0].end_time, Some(reopened.activities()[0].start_time + 5400.));

        let current = std::fs::read_to_string(dir.path().join(CURRENT_ACTIVITY_FILE_NAME))?;
        assert_eq!(current.trim(), "null");
        Ok(())
    }

    #[tokio::test]
    async fn starting_stops_previous_activity() -> Result<()> {
        let dir = tempdir()?;
        let mut tracker = TimeTracker::open(dir.path()).await?;
        tracker.start("a".into(), None, at(Duration::zero())).await?;
        tracker
            .start("b".into(), None, at(Duration::minutes(30)))
            .await?;
        assert_eq!(tracker.activities().len(), 1);
        assert_eq!(tracker.activities()[0].name, "a");
        assert_eq!(tracker.activities()[0].category, DEFAULT_CATEGORY);
        assert_eq!(tracker.current().map(|a| a.name.as_str()), Some("b"));
        Ok(())
    }

    #[tokio::test]
    async fn zero_length_activity_is_not_stored() -> Result<()> {
        let dir = tempdir()?;
        let mut tracker = TimeTracker::open(dir.path()).await?;
        tracker.start("blink".into(), None, at(Duration::zero())).await?;
        assert_eq!(tracker.stop(at(Duration::zero())).await?, 0.);
        assert!(tracker.activities().is_empty());
        assert!(tracker.current().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn summaries_split_by_category() -> Result<()> {
        let dir = tempdir()?;
        let mut tracker = TimeTracker::open(dir.path()).await?;
        tracker
            .start("code".into(), Some("Work".into()), at(Duration::zero()))
            .await?;
        tracker
            .start("read".into(), Some("Study".into()), at(Duration::hours(3)))
            .await?;
        tracker.stop(at(Duration::hours(4))).await?;
        // The previous Monday belongs to the same week, the Sunday before it doesn't.
        tracker
            .start("plan".into(), Some("Work".into()), at(Duration::days(-2)))
            .await?;
        tracker.stop(at(Duration::days(-2) + Duration::hours(1))).await?;
        tracker
            .start("old".into(), Some("Work".into()), at(Duration::days(-3)))
            .await?;
        tracker.stop(at(Duration::days(-3) + Duration::hours(1))).await?;

        let today = TEST_DATE_TIME.date();
        let daily = tracker.daily_summary(today);
        assert_eq!(daily.activities.len(), 2);
        assert_eq!(daily.total, 4. * 3600.);
        assert_eq!(daily.categories[0].category, "Work");
        assert_eq!(daily.categories[0].share.to_string(), "75.0%");

        let weekly = tracker.weekly_summary(today);
        assert_eq!(weekly.week_start, NaiveDate::from_ymd_opt(2024, 4, 8).unwrap());
        assert_eq!(weekly.days.len(), 7);
        assert_eq!(weekly.days[0].1, 3600.);
        assert_eq!(weekly.days[2].1, 4. * 3600.);
        assert_eq!(weekly.total, 5. * 3600.);

        let report = tracker.report(7, today);
        assert_eq!(report.total_hours, 6.);
        assert_eq!(report.daily_hours.len(), 3);
        assert_eq!(report.category_hours[0], ("Work".to_string(), 5.));

        assert_eq!(tracker.categories(), vec!["Study".to_string(), "Work".to_string()]);
        Ok(())
    }
}
