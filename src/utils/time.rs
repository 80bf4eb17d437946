use chrono::{DateTime, Local, TimeZone};

/// `HH:MM:SS`, hours are not wrapped.
pub fn format_clock_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.) as u64;
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// `MM:SS` used by the pomodoro countdown.
pub fn format_countdown(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Seconds since epoch with sub-second precision, the representation time tracking stores use.
pub fn epoch_seconds<Tz: TimeZone>(moment: &DateTime<Tz>) -> f64 {
    moment.timestamp_millis() as f64 / 1000.
}

pub fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Local>> {
    DateTime::from_timestamp_millis((seconds * 1000.).round() as i64)
        .map(|v| v.with_timezone(&Local))
}

#[cfg(test)]
mod tests {
    use super::{epoch_seconds, format_clock_duration, format_countdown, from_epoch_seconds};

    #[test]
    fn clock_duration_does_not_wrap_hours() {
        assert_eq!(format_clock_duration(0.), "00:00:00");
        assert_eq!(format_clock_duration(3725.9), "01:02:05");
        assert_eq!(format_clock_duration(100. * 3600.), "100:00:00");
    }

    #[test]
    fn countdown_format() {
        assert_eq!(format_countdown(25 * 60), "25:00");
        assert_eq!(format_countdown(61), "01:01");
    }

    #[test]
    fn epoch_seconds_keep_milliseconds() {
        let moment = chrono::DateTime::from_timestamp_millis(1_530_662_400_250).unwrap();
        let seconds = epoch_seconds(&moment);
        assert_eq!(seconds, 1_530_662_400.25);
        assert_eq!(from_epoch_seconds(seconds).unwrap(), moment);
    }
}
