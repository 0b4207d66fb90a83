//! Listing and lookup of events: normalize, filter, sort, limit.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::models::{Event, EVENT_PARTITION};
use crate::normalize::normalize;
use crate::record::Record;
use crate::store::TableStore;
use crate::Result;

/// Options for listing events, parsed from query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    /// Keep at most this many events
    pub limit: Option<usize>,
    /// Only events dated at or after the request instant
    pub upcoming: bool,
}

impl ListOptions {
    pub fn from_params(limit: Option<&str>, upcoming: Option<&str>) -> Self {
        Self {
            limit: parse_limit(limit),
            upcoming: parse_upcoming(upcoming),
        }
    }
}

/// `true` only for a case-insensitive `"true"`.
pub fn parse_upcoming(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.to_lowercase() == "true")
}

/// Non-negative limit; anything unparseable is logged and ignored.
pub fn parse_limit(value: Option<&str>) -> Option<usize> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    match value.parse::<usize>() {
        Ok(limit) => Some(limit),
        Err(_) => {
            warn!("Invalid limit parameter: {}", value);
            None
        }
    }
}

/// Events dated before `now` are dropped; undated ones are kept.
fn is_upcoming(event: &Event, now: DateTime<Utc>) -> bool {
    event
        .event_date()
        .map_or(true, |date| date.with_timezone(&Utc) >= now)
}

/// Run the list pipeline over already-fetched records.
///
/// Records that fail to normalize are skipped with a warning. The sort is
/// stable: equal dates keep enumeration order, undated events go last.
pub fn select_events(
    records: impl IntoIterator<Item = Record>,
    options: &ListOptions,
    now: DateTime<Utc>,
) -> Vec<Event> {
    let mut events: Vec<Event> = records
        .into_iter()
        .filter_map(|record| match normalize(&record) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(row_key = ?record.get("RowKey"), "Failed to parse entity: {}", e);
                None
            }
        })
        .filter(|event| !options.upcoming || is_upcoming(event, now))
        .collect();

    events.sort_by_key(|event| (event.event_date().is_none(), event.event_date()));

    if let Some(limit) = options.limit {
        events.truncate(limit);
    }

    events
}

/// List events from the store.
pub async fn list_events<S: TableStore>(
    store: &S,
    options: &ListOptions,
    now: DateTime<Utc>,
) -> Result<Vec<Event>> {
    let records = store.list_entities().await?;
    let fetched = records.len();
    let events = select_events(records, options, now);

    info!(
        fetched,
        returned = events.len(),
        upcoming = options.upcoming,
        limit = ?options.limit,
        "Listed events"
    );
    Ok(events)
}

/// Fetch and normalize a single event by row key.
pub async fn get_event<S: TableStore>(store: &S, id: &str) -> Result<Event> {
    let record = store.get_entity(EVENT_PARTITION, id).await?;
    Ok(normalize(&record)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EntityValue;
    use crate::store::InMemoryTable;
    use crate::Error;

    fn raw(row_key: &str, title: &str, date: Option<&str>) -> Record {
        let mut record = Record::new();
        record.insert("PartitionKey".to_string(), "EVENT".into());
        record.insert("RowKey".to_string(), row_key.into());
        record.insert("title".to_string(), title.into());
        if let Some(date) = date {
            record.insert("eventDate".to_string(), EntityValue::from(date));
        }
        record
    }

    fn now() -> DateTime<Utc> {
        "2025-03-01T12:00:00Z".parse().unwrap()
    }

    fn row_keys(events: &[Event]) -> Vec<&str> {
        events.iter().map(Event::row_key).collect()
    }

    #[test]
    fn test_parse_upcoming() {
        assert!(parse_upcoming(Some("true")));
        assert!(parse_upcoming(Some("TRUE")));
        assert!(parse_upcoming(Some("True")));
        assert!(!parse_upcoming(Some("yes")));
        assert!(!parse_upcoming(Some("1")));
        assert!(!parse_upcoming(Some(" true")));
        assert!(!parse_upcoming(None));
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(Some("5")), Some(5));
        assert_eq!(parse_limit(Some(" 3 ")), Some(3));
        assert_eq!(parse_limit(Some("0")), Some(0));
        assert_eq!(parse_limit(Some("abc")), None);
        assert_eq!(parse_limit(Some("-1")), None);
        assert_eq!(parse_limit(Some("")), None);
        assert_eq!(parse_limit(None), None);
    }

    #[test]
    fn test_sorts_ascending_by_date() {
        let records = vec![
            raw("june", "Picnic", Some("2025-06-01T00:00:00Z")),
            raw("jan", "Retreat", Some("2025-01-01T00:00:00Z")),
        ];
        let events = select_events(records, &ListOptions::default(), now());
        assert_eq!(row_keys(&events), vec!["jan", "june"]);
    }

    #[test]
    fn test_sort_is_stable_and_compares_instants() {
        let records = vec![
            raw("a", "A", Some("2025-05-01T10:00:00Z")),
            raw("b", "B", Some("2025-05-01T06:00:00-04:00")),
            raw("c", "C", Some("2025-05-01T09:00:00Z")),
            raw("d", "D", Some("2025-05-01T10:00:00Z")),
        ];
        let events = select_events(records, &ListOptions::default(), now());
        assert_eq!(row_keys(&events), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_undated_events_sort_last() {
        let records = vec![
            raw("undated", "Someday", None),
            raw("dated", "Easter", Some("2025-04-20T09:00:00Z")),
        ];
        let events = select_events(records, &ListOptions::default(), now());
        assert_eq!(row_keys(&events), vec!["dated", "undated"]);
    }

    #[test]
    fn test_upcoming_excludes_past_events() {
        let records = vec![
            raw("r1", "Potluck", Some("2020-01-01T10:00:00Z")),
            raw("future", "Picnic", Some("2025-06-01T00:00:00Z")),
            raw("exact", "Noon", Some("2025-03-01T12:00:00Z")),
        ];
        let options = ListOptions::from_params(None, Some("true"));
        let events = select_events(records, &options, now());
        assert_eq!(row_keys(&events), vec!["exact", "future"]);
    }

    #[test]
    fn test_upcoming_keeps_undated_events() {
        let records = vec![raw("undated", "Someday", None)];
        let options = ListOptions::from_params(None, Some("true"));
        assert_eq!(select_events(records, &options, now()).len(), 1);
    }

    #[test]
    fn test_skips_unparseable_records() {
        let records = vec![
            raw("bad", "Broken", Some("not a date")),
            raw("good", "Fine", Some("2025-01-01T00:00:00Z")),
        ];
        let events = select_events(records, &ListOptions::default(), now());
        assert_eq!(row_keys(&events), vec!["good"]);
    }

    #[test]
    fn test_limit_keeps_earliest() {
        let records: Vec<Record> = (1..=5)
            .rev()
            .map(|day| {
                raw(
                    &format!("d{}", day),
                    "Service",
                    Some(&format!("2025-01-0{}T00:00:00Z", day)),
                )
            })
            .collect();

        let events = select_events(records.clone(), &ListOptions::from_params(Some("2"), None), now());
        assert_eq!(row_keys(&events), vec!["d1", "d2"]);

        let events = select_events(records.clone(), &ListOptions::from_params(Some("50"), None), now());
        assert_eq!(events.len(), 5);

        let events = select_events(records, &ListOptions::from_params(Some("abc"), None), now());
        assert_eq!(row_keys(&events), vec!["d1", "d2", "d3", "d4", "d5"]);
    }

    #[tokio::test]
    async fn test_list_events_propagates_missing_table() {
        let table = InMemoryTable::missing("events");
        let err = list_events(&table, &ListOptions::default(), now()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_event_reads_event_partition() {
        let mut other = raw("r1", "Elsewhere", Some("2025-01-01T00:00:00Z"));
        other.insert("PartitionKey".to_string(), "ARCHIVE".into());
        let table = InMemoryTable::with_records(
            "events",
            vec![other, raw("r1", "Potluck", Some("2025-01-01T00:00:00Z"))],
        );

        let event = get_event(&table, "r1").await.unwrap();
        assert_eq!(event.title(), "Potluck");
        assert!(matches!(get_event(&table, "r2").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_event_surfaces_normalize_failure() {
        let table = InMemoryTable::with_records("events", vec![raw("r1", "Bad", Some("soon"))]);
        assert!(matches!(get_event(&table, "r1").await, Err(Error::Normalize(_))));
    }
}
