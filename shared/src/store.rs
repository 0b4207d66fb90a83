//! The table store the events are read from.

use async_trait::async_trait;

use crate::record::{EntityValue, Record};
use crate::{Error, Result};

/// Read access to a key-value table of raw records.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Enumerate every record in the table, in the store's order.
    ///
    /// Fails with [`Error::NotFound`] when the table itself does not exist.
    async fn list_entities(&self) -> Result<Vec<Record>>;

    /// Fetch one record by key, [`Error::NotFound`] when absent.
    async fn get_entity(&self, partition_key: &str, row_key: &str) -> Result<Record>;
}

#[async_trait]
impl<T: TableStore + ?Sized> TableStore for &T {
    async fn list_entities(&self) -> Result<Vec<Record>> {
        (**self).list_entities().await
    }

    async fn get_entity(&self, partition_key: &str, row_key: &str) -> Result<Record> {
        (**self).get_entity(partition_key, row_key).await
    }
}

/// Table held in memory, enumerated in insertion order.
#[derive(Debug, Clone)]
pub struct InMemoryTable {
    name: String,
    rows: Option<Vec<Record>>,
}

impl InMemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Some(Vec::new()),
        }
    }

    /// A table that does not exist; every call fails with `NotFound`.
    pub fn missing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: None,
        }
    }

    pub fn with_records(name: impl Into<String>, records: impl IntoIterator<Item = Record>) -> Self {
        let mut table = Self::new(name);
        for record in records {
            table.insert(record);
        }
        table
    }

    pub fn insert(&mut self, record: Record) {
        self.rows.get_or_insert_with(Vec::new).push(record);
    }

    fn rows(&self) -> Result<&[Record]> {
        self.rows
            .as_deref()
            .ok_or_else(|| Error::NotFound(format!("TableNotFound: table '{}'", self.name)))
    }
}

fn key_matches(record: &Record, field: &str, expected: &str) -> bool {
    matches!(record.get(field), Some(EntityValue::Text(value)) if value == expected)
}

#[async_trait]
impl TableStore for InMemoryTable {
    async fn list_entities(&self) -> Result<Vec<Record>> {
        Ok(self.rows()?.to_vec())
    }

    async fn get_entity(&self, partition_key: &str, row_key: &str) -> Result<Record> {
        self.rows()?
            .iter()
            .find(|record| {
                key_matches(record, "PartitionKey", partition_key)
                    && key_matches(record, "RowKey", row_key)
            })
            .cloned()
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "ResourceNotFound: ({}, {}) in table '{}'",
                    partition_key, row_key, self.name
                ))
            })
    }
}
