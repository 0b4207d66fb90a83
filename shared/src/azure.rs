//! Azure Table Storage client over the REST API.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::Sha256;
use tracing::debug;

use crate::connection::{ConnectionString, Credential};
use crate::record::{record_from_odata, Record};
use crate::store::TableStore;
use crate::{Config, Error, Result};

type HmacSha256 = Hmac<Sha256>;

const API_VERSION: &str = "2019-02-02";
const ACCEPT: &str = "application/json;odata=minimalmetadata";
const DATA_SERVICE_VERSION: &str = "3.0;NetFx";

const NEXT_PARTITION_KEY_HEADER: &str = "x-ms-continuation-nextpartitionkey";
const NEXT_ROW_KEY_HEADER: &str = "x-ms-continuation-nextrowkey";

/// Server-side paging position for a table query.
#[derive(Debug, Clone, PartialEq)]
pub struct Continuation {
    pub next_partition_key: String,
    pub next_row_key: Option<String>,
}

impl Continuation {
    /// Read the continuation headers of a query response, if any.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        Some(Self {
            next_partition_key: header(NEXT_PARTITION_KEY_HEADER)?,
            next_row_key: header(NEXT_ROW_KEY_HEADER),
        })
    }
}

#[derive(Debug, Deserialize)]
struct QueryPage {
    #[serde(default)]
    value: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorEnvelope {
    #[serde(rename = "odata.error")]
    error: ServiceError,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: String,
    message: ServiceErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorMessage {
    value: String,
}

/// Pull `(code, message)` out of an OData error body.
fn parse_service_error(body: &str) -> (String, String) {
    match serde_json::from_str::<ServiceErrorEnvelope>(body) {
        Ok(envelope) => {
            // The message carries RequestId/Time lines after the first one.
            let message = envelope
                .error
                .message
                .value
                .lines()
                .next()
                .unwrap_or_default()
                .to_string();
            (envelope.error.code, message)
        }
        Err(_) => ("Unknown".to_string(), body.trim().to_string()),
    }
}

/// Escape a key for use inside `PartitionKey='...'` in a URL path.
fn encode_key(key: &str) -> String {
    urlencoding::encode(&key.replace('\'', "''")).into_owned()
}

/// `x-ms-date` header value, RFC 1123.
fn format_request_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Client for a single table.
#[derive(Debug, Clone)]
pub struct AzureTableClient {
    http: reqwest::Client,
    connection: ConnectionString,
    table_name: String,
}

impl AzureTableClient {
    pub fn new(http: reqwest::Client, connection: ConnectionString, table_name: impl Into<String>) -> Self {
        Self {
            http,
            connection,
            table_name: table_name.into(),
        }
    }

    /// Client for the configured events table.
    pub fn from_config(config: &Config, http: reqwest::Client) -> Result<Self> {
        Ok(Self::new(http, config.connection()?, config.table_name.clone()))
    }

    fn parse_url(&self, raw: &str) -> Result<Url> {
        Url::parse(raw).map_err(|e| {
            Error::Config(format!("Invalid table endpoint '{}': {}", self.connection.table_endpoint, e))
        })
    }

    fn query_url(&self, continuation: Option<&Continuation>) -> Result<Url> {
        let mut url = self.parse_url(&format!(
            "{}/{}()",
            self.connection.table_endpoint, self.table_name
        ))?;

        if let Some(continuation) = continuation {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("NextPartitionKey", &continuation.next_partition_key);
            if let Some(row_key) = &continuation.next_row_key {
                pairs.append_pair("NextRowKey", row_key);
            }
        }

        self.with_sas(url)
    }

    fn entity_url(&self, partition_key: &str, row_key: &str) -> Result<Url> {
        let url = self.parse_url(&format!(
            "{}/{}(PartitionKey='{}',RowKey='{}')",
            self.connection.table_endpoint,
            self.table_name,
            encode_key(partition_key),
            encode_key(row_key)
        ))?;
        self.with_sas(url)
    }

    fn with_sas(&self, mut url: Url) -> Result<Url> {
        if let Credential::Sas(token) = &self.connection.credential {
            let query = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{}&{}", existing, token),
                _ => token.clone(),
            };
            url.set_query(Some(&query));
        }
        Ok(url)
    }

    /// SharedKeyLite string-to-sign for the table service.
    fn string_to_sign(&self, date: &str, url: &Url) -> String {
        format!("{}\n/{}{}", date, self.connection.account_name, url.path())
    }

    fn authorization(&self, date: &str, url: &Url) -> Result<Option<String>> {
        let Credential::SharedKey(key) = &self.connection.credential else {
            return Ok(None);
        };

        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|_| Error::Config("Invalid storage account key".to_string()))?;
        mac.update(self.string_to_sign(date, url).as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        Ok(Some(format!(
            "SharedKeyLite {}:{}",
            self.connection.account_name, signature
        )))
    }

    async fn send(&self, url: Url) -> Result<reqwest::Response> {
        let date = format_request_date(Utc::now());
        let mut request = self
            .http
            .get(url.clone())
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION)
            .header("Accept", ACCEPT)
            .header("DataServiceVersion", DATA_SERVICE_VERSION)
            .header("MaxDataServiceVersion", DATA_SERVICE_VERSION);

        if let Some(authorization) = self.authorization(&date, &url)? {
            request = request.header("Authorization", authorization);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let (code, message) = parse_service_error(&body);

        if status == StatusCode::NOT_FOUND {
            Err(Error::NotFound(format!("{}: {}", code, message)))
        } else {
            Err(Error::Storage(format!("{} {}: {}", status.as_u16(), code, message)))
        }
    }
}

#[async_trait]
impl TableStore for AzureTableClient {
    async fn list_entities(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut continuation: Option<Continuation> = None;
        let mut pages = 0u32;

        loop {
            let response = self.send(self.query_url(continuation.as_ref())?).await?;
            let next = Continuation::from_headers(response.headers());
            let page: QueryPage = response.json().await?;

            pages += 1;
            records.extend(page.value.iter().map(record_from_odata));

            match next {
                Some(next) => continuation = Some(next),
                None => break,
            }
        }

        debug!(table = %self.table_name, pages, count = records.len(), "Enumerated table");
        Ok(records)
    }

    async fn get_entity(&self, partition_key: &str, row_key: &str) -> Result<Record> {
        let response = self.send(self.entity_url(partition_key, row_key)?).await?;
        let entity: Map<String, Value> = response.json().await?;
        Ok(record_from_odata(&entity))
    }
}
