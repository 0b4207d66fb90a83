//! Configuration management for Lambda functions.

use std::env;

use crate::connection::ConnectionString;
use crate::{Error, Result};

/// Environment variable holding the storage account connection string.
pub const CONNECTION_STRING_VAR: &str = "AZURE_STORAGE_CONNECTION_STRING";
/// Environment variable naming the events table.
pub const TABLE_NAME_VAR: &str = "TABLE_NAME";

const DEFAULT_TABLE_NAME: &str = "events";

/// Application configuration loaded from environment variables.
///
/// Built once at process start. A missing connection string does not stop the
/// function from booting; it is reported on every request instead.
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage account connection string
    pub connection_string: Option<String>,
    /// Table holding event records
    pub table_name: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            connection_string: lookup(CONNECTION_STRING_VAR).filter(|s| !s.trim().is_empty()),
            table_name: lookup(TABLE_NAME_VAR)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
        }
    }

    /// Resolve the parsed storage connection.
    pub fn connection(&self) -> Result<ConnectionString> {
        let raw = self.connection_string.as_deref().ok_or_else(|| {
            Error::Config(format!("{} environment variable is not set", CONNECTION_STRING_VAR))
        })?;

        raw.parse::<ConnectionString>()
            .map_err(|e| Error::Config(format!("Invalid {}: {}", CONNECTION_STRING_VAR, e)))
    }
}
