//! Relative time labels ("3 hour(s) ago").

use chrono::{DateTime, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// `value / unit` rounded to the nearest integer, halves to even.
fn rounded(value: i64, unit: i64) -> i64 {
    (value as f64 / unit as f64).round_ties_even() as i64
}

/// Describe how long before `now` the instant `then` was.
///
/// Thresholds are strict: exactly one minute is still "Just now", exactly
/// seven days is "7 day(s) ago". Instants in the future read "Just now".
#[must_use]
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(then);
    let seconds = delta.num_seconds();
    let days = delta.num_days();

    if seconds > YEAR {
        format!("{} year(s) ago", rounded(days, 365))
    } else if seconds > MONTH {
        format!("{} month(s) ago", rounded(days, 30))
    } else if seconds > WEEK {
        format!("{} week(s) ago", rounded(days, 7))
    } else if seconds > DAY {
        format!("{days} day(s) ago")
    } else if seconds > HOUR {
        format!("{} hour(s) ago", rounded(seconds, HOUR))
    } else if seconds > MINUTE {
        format!("{} minute(s) ago", rounded(seconds, MINUTE))
    } else {
        "Just now".to_string()
    }
}

/// [`time_ago`] relative to the current time.
#[must_use]
pub fn time_ago_from_now(then: DateTime<Utc>) -> String {
    time_ago(then, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ago(duration: Duration) -> String {
        let now = Utc::now();
        time_ago(now - duration, now)
    }

    fn leading_number(label: &str) -> i64 {
        label
            .split_whitespace()
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(-1)
    }

    #[test]
    fn test_just_now() {
        assert_eq!(ago(Duration::zero()), "Just now");
        for seconds in [1, 30, 58, 60] {
            assert_eq!(ago(Duration::seconds(seconds)), "Just now");
        }
    }

    #[test]
    fn test_future_is_just_now() {
        assert_eq!(ago(Duration::seconds(-120)), "Just now");
    }

    #[test]
    fn test_minutes() {
        for minutes in 2..=58 {
            let label = ago(Duration::minutes(minutes));
            assert!(label.ends_with("minute(s) ago"), "{label}");
            assert_eq!(leading_number(&label), minutes);
        }
        assert_eq!(ago(Duration::seconds(61)), "1 minute(s) ago");
    }

    #[test]
    fn test_hours() {
        for hours in 2..=23 {
            let label = ago(Duration::hours(hours));
            assert!(label.ends_with("hour(s) ago"), "{label}");
            assert_eq!(leading_number(&label), hours);
        }
        // 90 minutes is a half, rounded to the even two
        assert_eq!(ago(Duration::minutes(90)), "2 hour(s) ago");
    }

    #[test]
    fn test_days() {
        for days in 2..=7 {
            assert_eq!(ago(Duration::days(days)), format!("{days} day(s) ago"));
        }
    }

    #[test]
    fn test_weeks() {
        for weeks in 2..=4 {
            assert_eq!(ago(Duration::weeks(weeks)), format!("{weeks} week(s) ago"));
        }
    }

    #[test]
    fn test_months() {
        for months in 2..=12 {
            let label = ago(Duration::days(months * 30));
            assert!(label.ends_with("month(s) ago"), "{label}");
            assert_eq!(leading_number(&label), months);
        }
    }

    #[test]
    fn test_years() {
        for years in 2..=20 {
            assert_eq!(
                ago(Duration::days(years * 365)),
                format!("{years} year(s) ago")
            );
        }
    }

    #[test]
    fn test_halves_round_to_even() {
        assert_eq!(ago(Duration::seconds(150)), "2 minute(s) ago");
        assert_eq!(ago(Duration::seconds(210)), "4 minute(s) ago");
        assert_eq!(ago(Duration::minutes(150)), "2 hour(s) ago");
        assert_eq!(ago(Duration::minutes(210)), "4 hour(s) ago");
        assert_eq!(ago(Duration::days(75)), "2 month(s) ago");
        assert_eq!(ago(Duration::days(105)), "4 month(s) ago");
    }
}
