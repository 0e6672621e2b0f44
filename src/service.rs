//! Lookup orchestration: credential → provider → report.

use crate::aggregator::ReportAggregator;
use crate::config::Config;
use crate::credentials::{Credential, CredentialPool};
use crate::providers::scamalytics::ScamalyticsClient;
use crate::providers::{LookupError, ReputationSource};
use crate::report::Report;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Answers "what is known about this IP?".
pub struct LookupService {
    pool: Arc<CredentialPool>,
    source: Box<dyn ReputationSource>,
    aggregator: ReportAggregator,
}

impl LookupService {
    pub fn new(
        pool: Arc<CredentialPool>,
        source: Box<dyn ReputationSource>,
        aggregator: ReportAggregator,
    ) -> Self {
        Self {
            pool,
            source,
            aggregator,
        }
    }

    /// Build a service backed by Scamalytics from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let credentials = config.credentials.iter().map(Credential::from).collect();
        let pool = Arc::new(CredentialPool::new(credentials)?);
        let client = ScamalyticsClient::new(&config.provider)?;

        info!(
            credentials = pool.len(),
            timeout_ms = config.provider.timeout_ms,
            "Lookup service initialized"
        );

        Ok(Self::new(
            pool,
            Box::new(client),
            ReportAggregator::new(config.thresholds.clone()),
        ))
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    /// Look up one IP. Consumes exactly one credential and never retries.
    pub async fn lookup(&self, ip: &str) -> Result<Report, LookupError> {
        let credential = self.pool.next();

        let raw = match self.source.lookup(ip, &credential).await {
            Ok(raw) => raw,
            Err(e) => {
                log_failure(ip, &credential, self.source.name(), &e);
                return Err(e);
            }
        };

        match self.aggregator.build(ip, &raw, &credential.id, &self.pool) {
            Ok(report) => {
                info!(
                    ip = %ip,
                    credential = %credential.id,
                    score = ?report.score,
                    risk = %report.risk_label(),
                    "Lookup complete"
                );
                Ok(report)
            }
            Err(e) => {
                log_failure(ip, &credential, self.source.name(), &e);
                Err(e)
            }
        }
    }
}

fn log_failure(ip: &str, credential: &Credential, provider: &str, e: &LookupError) {
    match e {
        LookupError::InternalContract(_) => {
            error!(ip = %ip, credential = %credential.id, provider, error = %e, "Provider schema mismatch");
        }
        _ => {
            warn!(ip = %ip, credential = %credential.id, provider, error = %e, "Lookup failed");
        }
    }
}

/// Coarse shape check: a dotted-quad IPv4 address, or something made of
/// hex digits, colons and dots that contains a colon (IPv6).
pub fn looks_like_ip(input: &str) -> bool {
    let input = input.trim();

    if input.contains(':') {
        return input.len() <= 45
            && input
                .chars()
                .all(|c| c.is_ascii_hexdigit() || c == ':' || c == '.');
    }

    let octets: Vec<&str> = input.split('.').collect();
    octets.len() == 4
        && octets.iter().all(|octet| {
            !octet.is_empty()
                && octet.len() <= 3
                && octet.chars().all(|c| c.is_ascii_digit())
                && octet.parse::<u16>().map_or(false, |n| n <= 255)
        })
}
