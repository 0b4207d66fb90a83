//! Shared data models.

use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone};
use serde::{Serialize, Serializer};

use crate::record::{EntityValue, Record};

/// Partition every event lives in.
pub const EVENT_PARTITION: &str = "EVENT";

const ROW_KEY_TITLE_CHARS: usize = 20;

/// An event as served by the API.
///
/// Immutable once built: either constructed fresh through [`Event::new`], or
/// reconstructed from storage by [`normalize`](crate::normalize::normalize).
/// Serializes to the public JSON shape with keys in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    title: String,
    description: String,
    location: String,
    #[serde(serialize_with = "serialize_event_date")]
    event_date: Option<DateTime<FixedOffset>>,
    partition_key: String,
    row_key: String,
}

impl Event {
    /// Build a new event in the `EVENT` partition with a derived row key.
    pub fn new<Tz: TimeZone>(
        title: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
        event_date: DateTime<Tz>,
    ) -> Self {
        let title = title.into();
        let event_date = event_date.fixed_offset();
        let row_key = derive_row_key(&event_date, &title);

        Self {
            title,
            description: description.into(),
            location: location.into(),
            event_date: Some(event_date),
            partition_key: EVENT_PARTITION.to_string(),
            row_key,
        }
    }

    /// Replace the derived row key.
    pub fn with_row_key(mut self, row_key: impl Into<String>) -> Self {
        self.row_key = row_key.into();
        self
    }

    /// Reassemble an event from already-resolved stored fields, keeping the
    /// stored keys verbatim.
    pub(crate) fn from_stored(
        title: String,
        description: String,
        location: String,
        event_date: Option<DateTime<FixedOffset>>,
        partition_key: String,
        row_key: String,
    ) -> Self {
        Self {
            title,
            description,
            location,
            event_date,
            partition_key,
            row_key,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// `None` when the stored record carried no date at all.
    pub fn event_date(&self) -> Option<DateTime<FixedOffset>> {
        self.event_date
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn row_key(&self) -> &str {
        &self.row_key
    }

    /// The stored shape of this event.
    pub fn to_entity(&self) -> Record {
        let mut record = Record::new();
        record.insert("PartitionKey".to_string(), self.partition_key.clone().into());
        record.insert("RowKey".to_string(), self.row_key.clone().into());
        record.insert("title".to_string(), self.title.clone().into());
        record.insert("description".to_string(), self.description.clone().into());
        record.insert("location".to_string(), self.location.clone().into());
        record.insert(
            "eventDate".to_string(),
            self.event_date
                .map(EntityValue::DateTime)
                .unwrap_or(EntityValue::Null),
        );
        record
    }
}

/// `<YYYYMMDDHHMMSS>_<first 20 chars of title, spaces as underscores>`.
pub fn derive_row_key(event_date: &DateTime<FixedOffset>, title: &str) -> String {
    let slug: String = title
        .replace(' ', "_")
        .chars()
        .take(ROW_KEY_TITLE_CHARS)
        .collect();
    format!("{}_{}", event_date.format("%Y%m%d%H%M%S"), slug)
}

/// ISO-8601 rendering used on the wire, e.g. `2025-06-01T18:30:00+00:00`.
pub fn format_event_date(event_date: &DateTime<FixedOffset>) -> String {
    event_date.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

fn serialize_event_date<S>(
    event_date: &Option<DateTime<FixedOffset>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match event_date {
        Some(date) => serializer.serialize_str(&format_event_date(date)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_new_derives_row_key() {
        let event = Event::new(
            "Community Potluck Dinner Night",
            "Bring a dish",
            "Fellowship Hall",
            date("2025-06-01T18:30:00Z"),
        );
        assert_eq!(event.partition_key(), "EVENT");
        assert_eq!(event.row_key(), "20250601183000_Community_Potluck_Di");
    }

    #[test]
    fn test_row_key_uses_event_local_time() {
        let event = Event::new("Choir", "", "", date("2025-06-01T18:30:05-05:00"));
        assert_eq!(event.row_key(), "20250601183005_Choir");
    }

    #[test]
    fn test_row_key_counts_characters_not_bytes() {
        let key = derive_row_key(&date("2025-01-01T00:00:00Z"), "Café Fête de Noël à l'église");
        assert_eq!(key, "20250101000000_Café_Fête_de_Noël_à_");
    }

    #[test]
    fn test_with_row_key_overrides() {
        let event = Event::new("Potluck", "", "", Utc::now()).with_row_key("custom");
        assert_eq!(event.row_key(), "custom");
    }

    #[test]
    fn test_serializes_in_stable_order() {
        let event = Event::new("Potluck", "d", "Hall", date("2020-01-01T10:00:00Z"))
            .with_row_key("r1");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"title":"Potluck","description":"d","location":"Hall","eventDate":"2020-01-01T10:00:00+00:00","partitionKey":"EVENT","rowKey":"r1"}"#
        );
    }

    #[test]
    fn test_fractional_seconds_only_when_present() {
        assert_eq!(
            format_event_date(&date("2025-03-09T08:00:00.250Z")),
            "2025-03-09T08:00:00.250+00:00"
        );
        assert_eq!(
            format_event_date(&date("2025-03-09T08:00:00-07:00")),
            "2025-03-09T08:00:00-07:00"
        );
    }

    #[test]
    fn test_to_entity_shape() {
        let event = Event::new("Potluck", "d", "Hall", date("2020-01-01T10:00:00Z"));
        let entity = event.to_entity();
        assert_eq!(entity["PartitionKey"], EntityValue::from("EVENT"));
        assert_eq!(entity["RowKey"], EntityValue::from(event.row_key()));
        assert_eq!(
            entity["eventDate"],
            EntityValue::DateTime(date("2020-01-01T10:00:00Z"))
        );
    }
}
