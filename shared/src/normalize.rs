//! Normalization of stored records into [`Event`]s.
//!
//! Historical entries spell their fields differently (`title` vs `Title`).
//! Each logical attribute owns an ordered alias list; the first alias holding
//! a value wins. Null counts as absent everywhere. Empty text counts as absent
//! for the content attributes only; storage keys may legitimately be empty and
//! are taken as stored.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::NormalizeError;
use crate::models::{Event, EVENT_PARTITION};
use crate::record::{EntityValue, Record};

/// A logical event attribute and the stored field names that may carry it.
#[derive(Debug, Clone, Copy)]
pub struct Attribute {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Whether empty text falls through to the next alias.
    pub blank_is_absent: bool,
}

pub const TITLE: Attribute = Attribute {
    name: "title",
    aliases: &["title", "Title"],
    blank_is_absent: true,
};
pub const DESCRIPTION: Attribute = Attribute {
    name: "description",
    aliases: &["description", "Description"],
    blank_is_absent: true,
};
pub const LOCATION: Attribute = Attribute {
    name: "location",
    aliases: &["location", "Location"],
    blank_is_absent: true,
};
pub const EVENT_DATE: Attribute = Attribute {
    name: "eventDate",
    aliases: &["eventDate", "EventDate"],
    blank_is_absent: true,
};
pub const PARTITION_KEY: Attribute = Attribute {
    name: "partitionKey",
    aliases: &["PartitionKey", "partitionKey"],
    blank_is_absent: false,
};
pub const ROW_KEY: Attribute = Attribute {
    name: "rowKey",
    aliases: &["RowKey", "rowKey"],
    blank_is_absent: false,
};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Convert a raw stored record into an [`Event`].
///
/// Stored `PartitionKey`/`RowKey` are kept verbatim; the row key is never
/// derived here, even when it is missing.
pub fn normalize(record: &Record) -> Result<Event, NormalizeError> {
    Ok(Event::from_stored(
        text_field(record, &TITLE, "")?,
        text_field(record, &DESCRIPTION, "")?,
        text_field(record, &LOCATION, "")?,
        event_date(record)?,
        text_field(record, &PARTITION_KEY, EVENT_PARTITION)?,
        text_field(record, &ROW_KEY, "")?,
    ))
}

/// First alias of `attribute` holding a usable value, with the field name it
/// was found under.
pub fn lookup<'a>(
    record: &'a Record,
    attribute: &Attribute,
) -> Option<(&'static str, &'a EntityValue)> {
    attribute.aliases.iter().find_map(|alias| match record.get(*alias) {
        None | Some(EntityValue::Null) => None,
        Some(EntityValue::Text(s)) if s.is_empty() && attribute.blank_is_absent => None,
        Some(value) => Some((*alias, value)),
    })
}

fn text_field(
    record: &Record,
    attribute: &Attribute,
    default: &str,
) -> Result<String, NormalizeError> {
    match lookup(record, attribute) {
        None => Ok(default.to_string()),
        Some((_, EntityValue::Text(s))) => Ok(s.clone()),
        Some((field, other)) => Err(NormalizeError::InvalidFieldType {
            attribute: attribute.name,
            field: field.to_string(),
            expected: "text",
            found: other.kind(),
        }),
    }
}

fn event_date(record: &Record) -> Result<Option<DateTime<FixedOffset>>, NormalizeError> {
    match lookup(record, &EVENT_DATE) {
        None => Ok(None),
        Some((_, EntityValue::DateTime(date))) => Ok(Some(*date)),
        Some((field, EntityValue::Text(text))) => parse_event_date(text)
            .map(Some)
            .ok_or_else(|| NormalizeError::MalformedDate {
                attribute: EVENT_DATE.name,
                field: field.to_string(),
                value: text.clone(),
            }),
        Some((field, other)) => Err(NormalizeError::InvalidFieldType {
            attribute: EVENT_DATE.name,
            field: field.to_string(),
            expected: "a timestamp or ISO-8601 text",
            found: other.kind(),
        }),
    }
}

/// Parse an ISO-8601 date or date-time.
///
/// A trailing `Z` means `+00:00`. Values without an offset are taken as UTC;
/// a bare date means midnight.
pub fn parse_event_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    let text = match text.strip_suffix('Z').or_else(|| text.strip_suffix('z')) {
        Some(stem) => format!("{}+00:00", stem),
        None => text.to_string(),
    };

    if let Ok(date) = DateTime::parse_from_rfc3339(&text) {
        return Some(date);
    }

    for format in OFFSET_FORMATS {
        if let Ok(date) = DateTime::parse_from_str(&text, format) {
            return Some(date);
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&text, format) {
            return Some(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }

    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
}
