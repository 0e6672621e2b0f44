//! IP reputation sources.

pub mod scamalytics;

use crate::credentials::Credential;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Fields reported by one sub-source, keyed by field name.
pub type SourceFields = Map<String, Value>;

/// Decoded provider response for one IP.
#[derive(Debug, Clone, Default)]
pub struct RawLookupResult {
    /// Provider status indicator ("ok" for results that reach aggregation).
    pub status: String,

    /// Fraud score (0-100, higher = worse).
    pub score: Option<u32>,

    /// Provider risk label, as sent.
    pub risk: Option<String>,

    /// Link to the provider's detail page for this IP.
    pub detail_url: Option<String>,

    /// Remaining queries for the credential that made this lookup.
    pub quota_remaining: Option<u64>,

    /// The provider's own proxy indicators.
    pub proxy: SourceFields,

    /// External data sources, keyed by source name.
    pub sources: BTreeMap<String, SourceFields>,
}

impl RawLookupResult {
    /// Fields of the named external source, if it reported anything.
    pub fn source(&self, name: &str) -> Option<&SourceFields> {
        self.sources.get(name)
    }
}

/// Failure of a single lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// Connect, DNS, timeout or body read failure.
    #[error("connection to provider failed: {0}")]
    Connectivity(String),

    /// Non-2xx HTTP response.
    #[error("provider responded with HTTP {code}")]
    ProviderHttp { code: u16 },

    /// Provider answered but refused the request (bad key, quota exhausted, bad IP).
    #[error("provider rejected the request: {message}")]
    ProviderLogical { message: String },

    /// Provider data did not have the expected shape.
    #[error("unexpected provider data: {0}")]
    InternalContract(String),
}

impl LookupError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LookupError::Connectivity(_) => ErrorCategory::Connectivity,
            LookupError::ProviderHttp { .. } | LookupError::ProviderLogical { .. } => {
                ErrorCategory::Provider
            }
            LookupError::InternalContract(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the caller may retry right away.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LookupError::Connectivity(_))
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LookupError::Connectivity("request timed out".to_string())
        } else {
            // The request URL carries the API key.
            LookupError::Connectivity(e.without_url().to_string())
        }
    }
}

/// User-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Connectivity,
    Provider,
    Internal,
}

impl ErrorCategory {
    /// Short message suitable for showing to an end user.
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCategory::Connectivity => "Could not reach the reputation provider",
            ErrorCategory::Provider => "The reputation provider rejected the request",
            ErrorCategory::Internal => "Something went wrong while reading the provider response",
        }
    }
}

/// A provider that can look up one IP with one credential.
#[async_trait]
pub trait ReputationSource: Send + Sync {
    /// Query the provider. Never retries.
    async fn lookup(&self, ip: &str, credential: &Credential)
        -> Result<RawLookupResult, LookupError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}
