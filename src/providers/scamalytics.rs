//! Scamalytics v3 reputation source.

use super::{LookupError, RawLookupResult, ReputationSource, SourceFields};
use crate::config::ProviderConfig;
use crate::credentials::Credential;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Top-level response envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    scamalytics: ScamalyticsData,

    #[serde(default)]
    external_datasources: Option<BTreeMap<String, Value>>,
}

/// The provider's own verdict block.
#[derive(Debug, Deserialize)]
struct ScamalyticsData {
    status: String,

    /// Fraud score (0-100).
    #[serde(default)]
    scamalytics_score: Option<u32>,

    /// Risk label ("low", "medium", "high", "very high").
    #[serde(default)]
    scamalytics_risk: Option<String>,

    #[serde(default)]
    scamalytics_url: Option<String>,

    #[serde(default)]
    scamalytics_proxy: Option<SourceFields>,

    #[serde(default)]
    credits: Option<Credits>,
}

#[derive(Debug, Deserialize)]
struct Credits {
    #[serde(default)]
    remaining: Option<i64>,
}

/// Scamalytics API client.
pub struct ScamalyticsClient {
    base_url: String,
    client: Client,
}

impl ScamalyticsClient {
    /// Create a new client.
    pub fn new(config: &ProviderConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("ip-risk-report/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Per-account endpoint.
    fn endpoint(&self, credential: &Credential) -> String {
        format!("{}/{}/", self.base_url, credential.id)
    }
}

#[async_trait]
impl ReputationSource for ScamalyticsClient {
    async fn lookup(
        &self,
        ip: &str,
        credential: &Credential,
    ) -> Result<RawLookupResult, LookupError> {
        debug!(ip = %ip, credential = %credential.id, "Querying Scamalytics");

        let response = self
            .client
            .get(self.endpoint(credential))
            .query(&[("key", credential.secret.as_str()), ("ip", ip)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(ip = %ip, credential = %credential.id, status = %status, "Scamalytics HTTP error");
            return Err(LookupError::ProviderHttp {
                code: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let result = decode_envelope(&body)?;

        debug!(
            ip = %ip,
            score = ?result.score,
            risk = ?result.risk,
            sources = result.sources.len(),
            remaining = ?result.quota_remaining,
            "Scamalytics lookup complete"
        );

        Ok(result)
    }

    fn name(&self) -> &str {
        "scamalytics"
    }
}

/// Decode and classify a 2xx response body.
pub(crate) fn decode_envelope(body: &[u8]) -> Result<RawLookupResult, LookupError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| LookupError::InternalContract(format!("response is not JSON: {}", e)))?;

    let block = value
        .get("scamalytics")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            LookupError::InternalContract("response has no scamalytics object".to_string())
        })?;

    // Classify before the strict decode: error envelopes carry few fields.
    let status = block.get("status").and_then(Value::as_str).unwrap_or("");
    if status != "ok" {
        let message = block
            .get("error")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or("unknown error")
            .to_string();
        return Err(LookupError::ProviderLogical { message });
    }

    let envelope: Envelope = serde_json::from_value(value)
        .map_err(|e| LookupError::InternalContract(format!("malformed envelope: {}", e)))?;

    let mut sources = BTreeMap::new();
    for (name, fields) in envelope.external_datasources.unwrap_or_default() {
        match fields {
            Value::Object(map) => {
                sources.insert(name, map);
            }
            Value::Null => {}
            other => {
                return Err(LookupError::InternalContract(format!(
                    "external source '{}' is not an object: {}",
                    name, other
                )));
            }
        }
    }

    let data = envelope.scamalytics;
    Ok(RawLookupResult {
        status: data.status,
        score: data.scamalytics_score,
        risk: data.scamalytics_risk,
        detail_url: data.scamalytics_url,
        quota_remaining: data
            .credits
            .and_then(|c| c.remaining)
            .map(|r| r.max(0) as u64),
        proxy: data.scamalytics_proxy.unwrap_or_default(),
        sources,
    })
}
