//! One-off event domain model.
//!
//! # Responsibility
//! - Define the persisted event record and its creation input.
//! - Parse the dotted date/time argument format used by `NEW EVENT`.
//!
//! # Invariants
//! - `id` is assigned by the repository and never reused.
//! - `title` is non-empty after trimming.
//! - `at` is a local civil date-time that actually exists on the calendar.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Days before `at` at which an event without `visible_from` becomes visible.
pub const DEFAULT_DEADLINE_VISIBLE_DAYS: i64 = 7;

/// Prefix of every generated event ID.
pub const EVENT_ID_PREFIX: &str = "ev";

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,4})\.(\d{1,2})\.(\d{1,2})$").expect("valid date regex"));
static TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})\.(\d{1,2})(?:\.(\d{1,2}))?$").expect("valid time regex")
});

/// Persisted one-off event.
///
/// Field names are serialized in the capitalized form used by the event file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "At")]
    pub at: DateTime<Local>,
    #[serde(rename = "Location", default)]
    pub location: String,
    #[serde(rename = "Notes", default)]
    pub notes: String,
    /// Optional date from which the event counts as upcoming.
    #[serde(
        rename = "VisibleFrom",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub visible_from: Option<NaiveDate>,
}

impl Event {
    /// Returns the instant from which this event is considered upcoming.
    ///
    /// Falls back to `at - DEFAULT_DEADLINE_VISIBLE_DAYS` when no explicit
    /// `visible_from` date is set.
    pub fn deadline_visible_start(&self) -> DateTime<Local> {
        match self.visible_from {
            Some(date) => local_midnight(date),
            None => self.at - Duration::days(DEFAULT_DEADLINE_VISIBLE_DAYS),
        }
    }
}

/// Creation input for an event; the repository assigns the ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub at: DateTime<Local>,
    pub location: String,
    pub notes: String,
    pub visible_from: Option<NaiveDate>,
}

impl NewEvent {
    pub fn new(title: impl Into<String>, at: DateTime<Local>) -> Self {
        Self {
            title: title.into(),
            at,
            location: String::new(),
            notes: String::new(),
            visible_from: None,
        }
    }

    pub(crate) fn into_event(self, id: String) -> Event {
        Event {
            id,
            title: self.title,
            at: self.at,
            location: self.location,
            notes: self.notes,
            visible_from: self.visible_from,
        }
    }
}

/// Formats the event ID for counter value `n`.
pub fn format_event_id(n: u64) -> String {
    format!("{EVENT_ID_PREFIX}{n}")
}

/// Extracts the numeric suffix of an `ev<N>` ID.
///
/// IDs that do not follow the generated shape yield `0`.
pub fn event_id_number(id: &str) -> u64 {
    id.strip_prefix(EVENT_ID_PREFIX)
        .and_then(|digits| digits.parse::<u64>().ok())
        .unwrap_or(0)
}

/// Date/time argument rejection reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTimeError {
    MalformedDate(String),
    MalformedTime(String),
    MonthOutOfRange(u32),
    DayOutOfRange(u32),
    HourOutOfRange(u32),
    MinuteOutOfRange(u32),
    SecondOutOfRange(u32),
    /// Components are in range but the day does not exist in that month.
    NoSuchDate { year: i32, month: u32, day: u32 },
    /// The civil time falls into a local clock gap.
    NoSuchLocalTime(String),
}

impl Display for EventTimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedDate(value) => write!(f, "date `{value}` is not YYYY.MM.DD"),
            Self::MalformedTime(value) => write!(f, "time `{value}` is not HH.MM or HH.MM.SS"),
            Self::MonthOutOfRange(value) => write!(f, "month must be 1-12, got {value}"),
            Self::DayOutOfRange(value) => write!(f, "day must be 1-31, got {value}"),
            Self::HourOutOfRange(value) => write!(f, "hour must be 0-23, got {value}"),
            Self::MinuteOutOfRange(value) => write!(f, "minute must be 0-59, got {value}"),
            Self::SecondOutOfRange(value) => write!(f, "second must be 0-59, got {value}"),
            Self::NoSuchDate { year, month, day } => {
                write!(f, "invalid date: {year:04}.{month:02}.{day:02}")
            }
            Self::NoSuchLocalTime(value) => write!(f, "local time `{value}` does not exist"),
        }
    }
}

impl Error for EventTimeError {}

/// Parses `YYYY.MM.DD` + `HH.MM[.SS]` into a local date-time.
///
/// # Errors
/// - Returns an error when either part is malformed or out of range.
/// - Returns `NoSuchDate` for dates like `2025.02.30` instead of rolling over.
pub fn parse_event_at(date: &str, time: &str) -> Result<DateTime<Local>, EventTimeError> {
    let date = parse_civil_date(date)?;
    let time = parse_civil_time(time)?;
    let naive = date.and_time(time);
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(at) => Ok(at),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(EventTimeError::NoSuchLocalTime(naive.to_string())),
    }
}

fn parse_civil_date(value: &str) -> Result<NaiveDate, EventTimeError> {
    let trimmed = value.trim();
    let captures = DATE_PATTERN
        .captures(trimmed)
        .ok_or_else(|| EventTimeError::MalformedDate(trimmed.to_string()))?;
    let year: i32 = parse_component(&captures[1], || EventTimeError::MalformedDate(trimmed.into()))?;
    let month: u32 =
        parse_component(&captures[2], || EventTimeError::MalformedDate(trimmed.into()))?;
    let day: u32 = parse_component(&captures[3], || EventTimeError::MalformedDate(trimmed.into()))?;

    if !(1..=12).contains(&month) {
        return Err(EventTimeError::MonthOutOfRange(month));
    }
    if !(1..=31).contains(&day) {
        return Err(EventTimeError::DayOutOfRange(day));
    }
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(EventTimeError::NoSuchDate { year, month, day })
}

fn parse_civil_time(value: &str) -> Result<NaiveTime, EventTimeError> {
    let trimmed = value.trim();
    let captures = TIME_PATTERN
        .captures(trimmed)
        .ok_or_else(|| EventTimeError::MalformedTime(trimmed.to_string()))?;
    let hour: u32 = parse_component(&captures[1], || EventTimeError::MalformedTime(trimmed.into()))?;
    let minute: u32 =
        parse_component(&captures[2], || EventTimeError::MalformedTime(trimmed.into()))?;
    let second: u32 = match captures.get(3) {
        Some(m) => parse_component(m.as_str(), || EventTimeError::MalformedTime(trimmed.into()))?,
        None => 0,
    };

    if hour > 23 {
        return Err(EventTimeError::HourOutOfRange(hour));
    }
    if minute > 59 {
        return Err(EventTimeError::MinuteOutOfRange(minute));
    }
    if second > 59 {
        return Err(EventTimeError::SecondOutOfRange(second));
    }
    NaiveTime::from_hms_opt(hour, minute, second)
        .ok_or_else(|| EventTimeError::MalformedTime(trimmed.to_string()))
}

fn parse_component<T: std::str::FromStr>(
    digits: &str,
    on_error: impl FnOnce() -> EventTimeError,
) -> Result<T, EventTimeError> {
    digits.parse::<T>().map_err(|_| on_error())
}

fn local_midnight(date: NaiveDate) -> DateTime<Local> {
    let naive = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}
