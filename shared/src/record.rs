//! Raw table records as they come back from storage.

use chrono::{DateTime, FixedOffset, TimeZone};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A raw key-value entry as stored in the table, before normalization.
pub type Record = BTreeMap<String, EntityValue>;

/// A single typed property value of a stored entity.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityValue {
    Text(String),
    DateTime(DateTime<FixedOffset>),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Null,
}

impl EntityValue {
    /// Name of the value's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            EntityValue::Text(_) => "text",
            EntityValue::DateTime(_) => "a timestamp",
            EntityValue::Integer(_) => "an integer",
            EntityValue::Double(_) => "a double",
            EntityValue::Boolean(_) => "a boolean",
            EntityValue::Null => "null",
        }
    }
}

impl From<&str> for EntityValue {
    fn from(value: &str) -> Self {
        EntityValue::Text(value.to_string())
    }
}

impl From<String> for EntityValue {
    fn from(value: String) -> Self {
        EntityValue::Text(value)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for EntityValue {
    fn from(value: DateTime<Tz>) -> Self {
        EntityValue::DateTime(value.fixed_offset())
    }
}

/// Decode one entity from the table service's OData JSON.
///
/// Properties annotated `Edm.DateTime` become timestamps and `Edm.Int64`
/// becomes an integer; `odata.*` metadata and the annotations themselves are
/// dropped. A value that does not match its annotation is kept as text.
pub fn record_from_odata(entity: &Map<String, Value>) -> Record {
    let mut record = Record::new();

    for (key, value) in entity {
        if key.starts_with("odata.") || key.contains("@odata.") {
            continue;
        }

        let type_hint = entity
            .get(&format!("{}@odata.type", key))
            .and_then(Value::as_str);

        let decoded = match (value, type_hint) {
            (Value::Null, _) => EntityValue::Null,
            (Value::String(s), Some("Edm.DateTime")) => DateTime::parse_from_rfc3339(s)
                .map(EntityValue::DateTime)
                .unwrap_or_else(|_| EntityValue::Text(s.clone())),
            (Value::String(s), Some("Edm.Int64")) => s
                .parse::<i64>()
                .map(EntityValue::Integer)
                .unwrap_or_else(|_| EntityValue::Text(s.clone())),
            (Value::String(s), Some("Edm.Double")) => s
                .parse::<f64>()
                .map(EntityValue::Double)
                .unwrap_or_else(|_| EntityValue::Text(s.clone())),
            (Value::String(s), _) => EntityValue::Text(s.clone()),
            (Value::Bool(b), _) => EntityValue::Boolean(*b),
            (Value::Number(n), _) => match n.as_i64() {
                Some(i) => EntityValue::Integer(i),
                None => EntityValue::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            (other, _) => EntityValue::Text(other.to_string()),
        };

        record.insert(key.clone(), decoded);
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Record {
        record_from_odata(value.as_object().unwrap())
    }

    #[test]
    fn test_decodes_annotated_datetime() {
        let record = decode(json!({
            "odata.etag": "W/\"datetime'2025-01-01T00%3A00%3A00Z'\"",
            "PartitionKey": "EVENT",
            "RowKey": "r1",
            "Timestamp": "2025-01-01T00:00:00.1234567Z",
            "eventDate@odata.type": "Edm.DateTime",
            "eventDate": "2025-06-01T18:30:00Z",
        }));

        assert!(!record.contains_key("odata.etag"));
        assert!(!record.contains_key("eventDate@odata.type"));
        assert_eq!(record["PartitionKey"], EntityValue::from("EVENT"));
        let expected = DateTime::parse_from_rfc3339("2025-06-01T18:30:00+00:00").unwrap();
        assert_eq!(record["eventDate"], EntityValue::DateTime(expected));
        // Unannotated strings stay textual even when they look like dates.
        assert!(matches!(record["Timestamp"], EntityValue::Text(_)));
    }

    #[test]
    fn test_decodes_scalars() {
        let record = decode(json!({
            "attendees@odata.type": "Edm.Int64",
            "attendees": "120",
            "capacity": 80,
            "price": 12.5,
            "featured": true,
            "notes": null,
        }));

        assert_eq!(record["attendees"], EntityValue::Integer(120));
        assert_eq!(record["capacity"], EntityValue::Integer(80));
        assert_eq!(record["price"], EntityValue::Double(12.5));
        assert_eq!(record["featured"], EntityValue::Boolean(true));
        assert_eq!(record["notes"], EntityValue::Null);
    }

    #[test]
    fn test_mismatched_annotation_falls_back_to_text() {
        let record = decode(json!({
            "eventDate@odata.type": "Edm.DateTime",
            "eventDate": "next tuesday",
        }));
        assert_eq!(record["eventDate"], EntityValue::from("next tuesday"));
    }
}
