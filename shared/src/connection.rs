//! Storage account connection strings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_TABLE_ENDPOINT: &str = "http://127.0.0.1:10002/devstoreaccount1";

#[derive(Error, Debug, PartialEq)]
pub enum ConnectionStringError {
    #[error("segment '{0}' is not a Key=Value pair")]
    MalformedSegment(String),
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("AccountKey is not valid base64")]
    InvalidAccountKey,
}

/// How requests to the table service are authorized.
#[derive(Clone, PartialEq)]
pub enum Credential {
    /// Decoded account key, used for SharedKeyLite signing
    SharedKey(Vec<u8>),
    /// Shared access signature query string, without the leading `?`
    Sas(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::SharedKey(_) => f.write_str("SharedKey(<redacted>)"),
            Credential::Sas(_) => f.write_str("Sas(<redacted>)"),
        }
    }
}

/// Parsed `Key=Value;...` storage connection string.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionString {
    pub account_name: String,
    /// Table service base URL, no trailing slash
    pub table_endpoint: String,
    pub credential: Credential,
}

impl ConnectionString {
    /// Settings for the local storage emulator.
    pub fn development() -> Self {
        Self {
            account_name: DEV_ACCOUNT_NAME.to_string(),
            table_endpoint: DEV_TABLE_ENDPOINT.to_string(),
            credential: Credential::SharedKey(
                STANDARD.decode(DEV_ACCOUNT_KEY).unwrap_or_default(),
            ),
        }
    }
}

impl FromStr for ConnectionString {
    type Err = ConnectionStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Keys are case-insensitive; values are kept verbatim (keys may end in '=').
        let mut settings: HashMap<String, String> = HashMap::new();
        for segment in s.split(';').map(str::trim).filter(|seg| !seg.is_empty()) {
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| ConnectionStringError::MalformedSegment(segment.to_string()))?;
            settings.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        if settings
            .get("usedevelopmentstorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return Ok(Self::development());
        }

        let account_name = settings.get("accountname").cloned().unwrap_or_default();

        let table_endpoint = match settings.get("tableendpoint") {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => {
                if account_name.is_empty() {
                    return Err(ConnectionStringError::Missing("AccountName or TableEndpoint"));
                }
                let protocol = settings
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or("https");
                let suffix = settings
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or("core.windows.net");
                format!("{}://{}.table.{}", protocol, account_name, suffix)
            }
        };

        let credential = if let Some(key) = settings.get("accountkey") {
            if account_name.is_empty() {
                return Err(ConnectionStringError::Missing("AccountName"));
            }
            let key = STANDARD
                .decode(key)
                .map_err(|_| ConnectionStringError::InvalidAccountKey)?;
            Credential::SharedKey(key)
        } else if let Some(sas) = settings.get("sharedaccesssignature") {
            Credential::Sas(sas.trim_start_matches('?').to_string())
        } else {
            return Err(ConnectionStringError::Missing("AccountKey or SharedAccessSignature"));
        };

        Ok(Self {
            account_name,
            table_endpoint,
            credential,
        })
    }
}
