//! Immutable weekly schedule loaded from CSV.
//!
//! # Responsibility
//! - Parse `weekday,start,end,title,location,tags` rows into `Slot`s once.
//! - Answer weekday lookups for `GET SCHEDULE`.
//!
//! # Invariants
//! - The header row is always skipped.
//! - Rows with fewer than six fields or an empty title are dropped silently.

use crate::model::slot::Slot;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Read;
use std::path::{Path, PathBuf};

const SLOT_FIELD_COUNT: usize = 6;

/// Schedule loading failure; fatal at startup.
#[derive(Debug)]
pub enum ScheduleError {
    Open { path: PathBuf, source: std::io::Error },
    Csv(csv::Error),
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { path, source } => {
                write!(f, "open schedule `{}`: {source}", path.display())
            }
            Self::Csv(err) => write!(f, "read schedule csv: {err}"),
        }
    }
}

impl Error for ScheduleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Csv(err) => Some(err),
        }
    }
}

impl From<csv::Error> for ScheduleError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

/// Read-only list of weekly slots in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    slots: Vec<Slot>,
}

impl Schedule {
    pub fn new(slots: Vec<Slot>) -> Self {
        Self { slots }
    }

    /// Loads a schedule from a CSV file.
    ///
    /// # Errors
    /// - Returns `Open` when the file cannot be opened.
    /// - Returns `Csv` when the content is not readable CSV.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, ScheduleError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ScheduleError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let schedule = Self::from_reader(file)?;
        info!(
            "event=schedule_load module=schedule status=ok path={} slots={}",
            path.display(),
            schedule.len()
        );
        Ok(schedule)
    }

    /// Parses CSV content from any reader; the first row is the header.
    pub fn from_reader(reader: impl Read) -> Result<Self, ScheduleError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut slots = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            if record.len() < SLOT_FIELD_COUNT {
                continue;
            }
            let field = |n: usize| record.get(n).unwrap_or_default().trim().to_string();
            let slot = Slot {
                weekday: field(0),
                start: field(1),
                end: field(2),
                title: field(3),
                location: field(4),
                tags: field(5),
            };
            if slot.title.is_empty() {
                continue;
            }
            slots.push(slot);
        }
        Ok(Self { slots })
    }

    /// Slots on `weekday`, compared case-insensitively, in file order.
    pub fn for_weekday<'a>(&'a self, weekday: &'a str) -> impl Iterator<Item = &'a Slot> + 'a {
        self.slots.iter().filter(move |slot| slot.is_on(weekday))
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
