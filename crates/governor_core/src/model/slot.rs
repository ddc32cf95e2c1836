//! Weekly recurring schedule entry.

/// One weekly schedule slot.
///
/// Times are kept as free text; no semantic validation is performed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Slot {
    /// Day name such as `Mon`; compared case-insensitively.
    pub weekday: String,
    pub start: String,
    pub end: String,
    pub title: String,
    pub location: String,
    pub tags: String,
}

impl Slot {
    /// Returns whether this slot falls on `weekday` (trimmed, case-insensitive).
    pub fn is_on(&self, weekday: &str) -> bool {
        self.weekday.eq_ignore_ascii_case(weekday.trim())
    }
}
