//! Endpoint logic for the events API, mapped onto status codes and bodies.
//!
//! The store is handed in as a `Result` so configuration failures surface
//! through the same error mapping as storage failures.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::http::ApiReply;
use crate::query::{get_event, list_events, ListOptions};
use crate::store::TableStore;
use crate::{Error, Result};

/// `GET /events`
pub async fn list_events_reply<S: TableStore>(
    store: Result<S>,
    limit: Option<&str>,
    upcoming: Option<&str>,
    now: DateTime<Utc>,
) -> ApiReply {
    info!("Processing GET request for events");

    let options = ListOptions::from_params(limit, upcoming);
    let result = match store {
        Ok(store) => list_events(&store, &options, now).await,
        Err(e) => Err(e),
    };

    match result.and_then(|events| ApiReply::json(200, &events)) {
        Ok(reply) => reply,
        Err(Error::NotFound(detail)) => {
            warn!("Events table not found: {}", detail);
            ApiReply::error(404, "Events table not found")
        }
        Err(err) => {
            error!("Error retrieving events: {}", err);
            ApiReply::error(err.status_code(), &err.public_message())
        }
    }
}

/// `GET /events/{id}`
pub async fn get_event_reply<S: TableStore>(store: Result<S>, id: Option<&str>) -> ApiReply {
    info!("Processing GET request for single event");

    let id = match id {
        Some(id) if !id.is_empty() => id,
        _ => return ApiReply::error(400, "Event ID is required"),
    };

    let result = match store {
        Ok(store) => get_event(&store, id).await,
        Err(e) => Err(e),
    };

    match result.and_then(|event| ApiReply::json(200, &event)) {
        Ok(reply) => reply,
        Err(Error::NotFound(detail)) => {
            info!(id, "Event not found: {}", detail);
            ApiReply::error(404, &format!("Event with ID '{}' not found", id))
        }
        Err(err) => {
            error!(id, "Error retrieving event: {}", err);
            ApiReply::error(err.status_code(), &err.public_message())
        }
    }
}
