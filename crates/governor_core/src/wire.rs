//! Flat wire rendering of events and slots for reply payloads.
//!
//! Fields are joined with `|`. Every text field has the transport separator
//! `:` replaced, and date-times are rendered without colons, so a naive split
//! of the reply line on `:` never yields extra protocol fields.

use crate::model::event::Event;
use crate::model::slot::Slot;
use crate::protocol::FIELD_SEPARATOR;

/// Separator between fields inside one wire string.
pub const WIRE_DELIMITER: &str = "|";

const SEPARATOR_SUBSTITUTE: char = '.';
const WIRE_AT_FORMAT: &str = "%Y.%m.%d.%H.%M";

/// Renders `id|title|at|location|notes`.
pub fn encode_event(event: &Event) -> String {
    let at = event.at.format(WIRE_AT_FORMAT).to_string();
    [
        sanitize(&event.id),
        sanitize(&event.title),
        at,
        sanitize(&event.location),
        sanitize(&event.notes),
    ]
    .join(WIRE_DELIMITER)
}

/// Renders `weekday|start|end|title|location|tags`.
pub fn encode_slot(slot: &Slot) -> String {
    [
        &slot.weekday,
        &slot.start,
        &slot.end,
        &slot.title,
        &slot.location,
        &slot.tags,
    ]
    .iter()
    .map(|field| sanitize(field))
    .collect::<Vec<_>>()
    .join(WIRE_DELIMITER)
}

/// Replaces transport separators inside one free-text field.
pub fn sanitize(value: &str) -> String {
    value.replace(FIELD_SEPARATOR, &SEPARATOR_SUBSTITUTE.to_string())
}

#[cfg(test)]
mod tests {
    use super::{encode_event, encode_slot};
    use crate::model::event::{parse_event_at, NewEvent};
    use crate::model::slot::Slot;

    #[test]
    fn event_renders_colon_free_timestamp_and_empty_trailing_fields() {
        let at = parse_event_at("2025.03.10", "09.30").expect("valid date/time");
        let event = NewEvent::new("Standup", at).into_event("ev1".to_string());
        assert_eq!(encode_event(&event), "ev1|Standup|2025.03.10.09.30||");
    }

    #[test]
    fn event_text_fields_lose_separator_characters() {
        let at = parse_event_at("2025.03.10", "09.30").expect("valid date/time");
        let mut new_event = NewEvent::new("Review: phase 2", at);
        new_event.location = "Room 4:12".to_string();
        new_event.notes = "bring a:b".to_string();
        let wire = encode_event(&new_event.into_event("ev7".to_string()));
        assert!(!wire.contains(':'));
        assert_eq!(wire, "ev7|Review. phase 2|2025.03.10.09.30|Room 4.12|bring a.b");
    }

    #[test]
    fn slot_times_are_made_colon_free() {
        let slot = Slot {
            weekday: "Mon".to_string(),
            start: "10:45".to_string(),
            end: "12:10".to_string(),
            title: "Algebra".to_string(),
            location: "B-201".to_string(),
            tags: "lecture".to_string(),
        };
        assert_eq!(encode_slot(&slot), "Mon|10.45|12.10|Algebra|B-201|lecture");
    }
}
