//! Relative timestamps for list rows

use chrono::{DateTime, Datelike, Utc};

/// Format `at` relative to `now`
///
/// Under a minute is "just now", then minutes, hours and days up to a
/// week; older timestamps show the date, with the year only when it
/// differs from `now`. Timestamps in the future read as "just now".
pub fn format_relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    let seconds = elapsed.num_seconds();

    if seconds < 60 {
        return "just now".to_string();
    }
    if seconds < 3_600 {
        return format!("{}m ago", elapsed.num_minutes());
    }
    if seconds < 86_400 {
        return format!("{}h ago", elapsed.num_hours());
    }
    if elapsed.num_days() < 7 {
        return format!("{}d ago", elapsed.num_days());
    }

    if at.year() == now.year() {
        at.format("%b %-d").to_string()
    } else {
        at.format("%b %-d, %Y").to_string()
    }
}

/// [`format_relative`] against the current time
pub fn format_since(at: DateTime<Utc>) -> String {
    format_relative(at, Utc::now())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn recent_and_future_are_just_now() {
        assert_eq!(format_relative(now() - Duration::seconds(59), now()), "just now");
        assert_eq!(format_relative(now() + Duration::minutes(5), now()), "just now");
    }

    #[test]
    fn minutes_hours_days() {
        assert_eq!(format_relative(now() - Duration::minutes(5), now()), "5m ago");
        assert_eq!(format_relative(now() - Duration::hours(3), now()), "3h ago");
        assert_eq!(format_relative(now() - Duration::days(6), now()), "6d ago");
    }

    #[test]
    fn older_dates_show_the_calendar_date() {
        assert_eq!(format_relative(now() - Duration::days(10), now()), "Jun 5");
        let last_year = Utc.with_ymd_and_hms(2023, 12, 31, 8, 0, 0).unwrap();
        assert_eq!(format_relative(last_year, now()), "Dec 31, 2023");
    }
}
