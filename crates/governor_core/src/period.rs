//! Calendar windows for deadline queries.
//!
//! # Responsibility
//! - Map a named calendar period plus "now" to an inclusive instant range.
//!
//! # Invariants
//! - Weeks start on Monday.
//! - `end` is one nanosecond before the start of the next period, so both
//!   bounds are inclusive.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use std::str::FromStr;

/// Named calendar period accepted by `GET DEADLINES <period>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl FromStr for Period {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(()),
        }
    }
}

/// Inclusive instant range `[start, end]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl<Tz: TimeZone> DateRange<Tz> {
    /// Range from `now` through `now + lookahead`.
    ///
    /// An end past the representable calendar is clamped to its last instant.
    pub fn lookahead(now: DateTime<Tz>, lookahead: Duration) -> Self {
        let end = now
            .clone()
            .checked_add_signed(lookahead)
            .unwrap_or_else(|| DateTime::<Utc>::MAX_UTC.with_timezone(&now.timezone()));
        Self { start: now, end }
    }

    /// Returns whether `at` lies within the range, both ends included.
    pub fn contains<Other: TimeZone>(&self, at: &DateTime<Other>) -> bool {
        *at >= self.start && *at <= self.end
    }
}

impl Period {
    /// Computes the calendar window of this period that contains `now`.
    pub fn bounds<Tz: TimeZone>(self, now: &DateTime<Tz>) -> DateRange<Tz> {
        let tz = now.timezone();
        let today = now.date_naive();
        let (first, next) = match self {
            Self::Day => (today, today + Duration::days(1)),
            Self::Week => {
                let monday =
                    today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                (monday, monday + Duration::days(7))
            }
            Self::Month => {
                let first = today.with_day(1).unwrap_or(today);
                (first, first + Months::new(1))
            }
            Self::Year => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                (first, first + Months::new(12))
            }
        };

        let start = start_of_day(&tz, first);
        let end = start_of_day(&tz, next) - Duration::nanoseconds(1);
        DateRange { start, end }
    }
}

/// Resolves a period name into its window around `now`.
///
/// Returns `None` for names other than `day`, `week`, `month` and `year`.
pub fn period_bounds<Tz: TimeZone>(name: &str, now: &DateTime<Tz>) -> Option<DateRange<Tz>> {
    name.parse::<Period>().ok().map(|period| period.bounds(now))
}

fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let naive = date.and_time(NaiveTime::MIN);
    // Midnight can fall into a DST gap in some zones.
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}
