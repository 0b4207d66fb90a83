//! Shared library for the Events API Lambda functions.
//!
//! This crate provides the event model, record normalization, the table store
//! clients and the endpoint logic used by the Lambda binaries.

pub mod azure;
pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod http;
pub mod models;
pub mod normalize;
pub mod query;
pub mod record;
pub mod store;

pub use azure::AzureTableClient;
pub use config::Config;
pub use error::{Error, NormalizeError, Result};
pub use handlers::{get_event_reply, list_events_reply};
pub use http::ApiReply;
pub use models::{Event, EVENT_PARTITION};
pub use normalize::normalize;
pub use record::{EntityValue, Record};
pub use store::{InMemoryTable, TableStore};
