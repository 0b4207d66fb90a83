//! Events Lambda - Handles the read-only events endpoints.
//!
//! Endpoints:
//! - GET /events - List events (`limit`, `upcoming` query parameters)
//! - GET /events/{id} - Get a single event by row key

use chrono::Utc;
use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use shared::http::{error_response, into_response};
use shared::{get_event_reply, list_events_reply, AzureTableClient, Config, TableStore};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state
struct AppState {
    config: Config,
    http: reqwest::Client,
}

impl AppState {
    fn new() -> Result<Self, Error> {
        let config = Config::from_env();
        if config.connection_string.is_none() {
            warn!("AZURE_STORAGE_CONNECTION_STRING not set; requests will fail until it is");
        }
        info!(table = %config.table_name, "Loaded events configuration");

        let http = reqwest::Client::builder().build()?;

        Ok(Self { config, http })
    }

    fn table(&self) -> shared::Result<AzureTableClient> {
        AzureTableClient::from_config(&self.config, self.http.clone())
    }
}

#[derive(Debug, PartialEq)]
enum Route {
    List,
    Get(Option<String>),
    MethodNotAllowed,
    NotFound,
}

fn route(method: &str, raw_path: &str, path_id: Option<&str>) -> Route {
    // Strip /api prefix if present (function apps and gateway stages mount there)
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path);

    let route = if path == "/events" {
        Route::List
    } else if let Some(rest) = path.strip_prefix("/events/") {
        if rest.contains('/') {
            return Route::NotFound;
        }
        let id = path_id
            .filter(|id| !id.is_empty())
            .map(String::from)
            .or_else(|| urlencoding::decode(rest).ok().map(|id| id.into_owned()));
        Route::Get(id)
    } else {
        return Route::NotFound;
    };

    if method == "GET" {
        route
    } else {
        Route::MethodNotAllowed
    }
}

async fn respond<S, F>(event: &Request, table: F) -> Result<Response<Body>, Error>
where
    S: TableStore,
    F: FnOnce() -> shared::Result<S>,
{
    let path_params = event.path_parameters();
    let reply = match route(event.method().as_str(), event.uri().path(), path_params.first("id")) {
        Route::List => {
            let params = event.query_string_parameters();
            list_events_reply(
                table(),
                params.first("limit"),
                params.first("upcoming"),
                Utc::now(),
            )
            .await
        }
        Route::Get(id) => get_event_reply(table(), id.as_deref()).await,
        Route::MethodNotAllowed => return error_response(405, "Method not allowed"),
        Route::NotFound => return error_response(404, "Not found"),
    };

    into_response(reply)
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    respond(&event, || state.table()).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new()?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
