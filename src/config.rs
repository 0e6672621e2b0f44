//! Configuration types for the IP risk report.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Provider endpoint settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Provider accounts, used in this order for round-robin selection.
    #[serde(default)]
    pub credentials: Vec<CredentialConfig>,

    /// Display thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,
}

/// Scamalytics endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Base URL; the account user is appended as a path segment.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api12.scamalytics.com/v3".to_string()
}

fn default_timeout() -> u64 {
    10_000
}

/// One provider account.
#[derive(Clone, Deserialize, Serialize)]
pub struct CredentialConfig {
    /// API user (supports ${ENV_VAR} syntax).
    pub user: String,

    /// API key (supports ${ENV_VAR} syntax).
    pub api_key: String,
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("user", &self.user)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Display thresholds for scores and remaining quota.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Thresholds {
    #[serde(default)]
    pub score: ScoreThresholds,

    #[serde(default)]
    pub quota: QuotaThresholds,
}

/// Fraud score tiers (0-100, higher = worse). Each value is the lowest
/// score that falls into that tier.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct ScoreThresholds {
    #[serde(default = "default_score_medium")]
    pub medium: u32,

    #[serde(default = "default_score_high")]
    pub high: u32,

    #[serde(default = "default_score_very_high")]
    pub very_high: u32,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            medium: default_score_medium(),
            high: default_score_high(),
            very_high: default_score_very_high(),
        }
    }
}

fn default_score_medium() -> u32 {
    25
}

fn default_score_high() -> u32 {
    50
}

fn default_score_very_high() -> u32 {
    75
}

/// Remaining quota tiers. A total strictly above a value falls into that tier.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct QuotaThresholds {
    #[serde(default = "default_quota_plentiful")]
    pub plentiful: u64,

    #[serde(default = "default_quota_adequate")]
    pub adequate: u64,

    #[serde(default = "default_quota_low")]
    pub low: u64,
}

impl Default for QuotaThresholds {
    fn default() -> Self {
        Self {
            plentiful: default_quota_plentiful(),
            adequate: default_quota_adequate(),
            low: default_quota_low(),
        }
    }
}

fn default_quota_plentiful() -> u64 {
    500
}

fn default_quota_adequate() -> u64 {
    100
}

fn default_quota_low() -> u64 {
    20
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content);
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.credentials.is_empty() {
            anyhow::bail!("At least one credential must be configured");
        }

        let mut seen = HashSet::new();
        for (i, credential) in self.credentials.iter().enumerate() {
            if credential.user.trim().is_empty() {
                anyhow::bail!("Credential #{} has an empty user", i + 1);
            }
            if credential.api_key.trim().is_empty() {
                anyhow::bail!("Credential '{}' has an empty api_key", credential.user);
            }
            if !seen.insert(credential.user.as_str()) {
                anyhow::bail!("Credential '{}' is configured more than once", credential.user);
            }
        }

        if self.provider.timeout_ms == 0 {
            anyhow::bail!("provider.timeout_ms must be greater than 0");
        }

        if self.provider.base_url.trim().is_empty() {
            anyhow::bail!("provider.base_url must not be empty");
        }

        let score = &self.thresholds.score;
        if !(score.medium <= score.high && score.high <= score.very_high) {
            anyhow::bail!(
                "Score thresholds must be ordered medium ({}) <= high ({}) <= very_high ({})",
                score.medium,
                score.high,
                score.very_high
            );
        }

        let quota = &self.thresholds.quota;
        if !(quota.low <= quota.adequate && quota.adequate <= quota.plentiful) {
            anyhow::bail!(
                "Quota thresholds must be ordered low ({}) <= adequate ({}) <= plentiful ({})",
                quota.low,
                quota.adequate,
                quota.plentiful
            );
        }

        Ok(())
    }

    /// Generate example configuration YAML.
    pub fn example() -> String {
        r#"# IP Risk Report Configuration

provider:
  base_url: "https://api12.scamalytics.com/v3"
  timeout_ms: 10000            # Request timeout

# Scamalytics accounts, used round-robin in this order
credentials:
  - user: "${SCAMALYTICS_USER}"
    api_key: "${SCAMALYTICS_API_KEY}"
  - user: "${SCAMALYTICS_USER_2}"
    api_key: "${SCAMALYTICS_API_KEY_2}"

thresholds:
  # Fraud score (0-100): lowest score of each tier
  score:
    medium: 25
    high: 50
    very_high: 75
  # Remaining requests across all accounts: tier applies above the value
  quota:
    plentiful: 500
    adequate: 100
    low: 20
"#
        .to_string()
    }
}

/// Expand environment variables in the format ${VAR_NAME}.
fn expand_env_vars(content: &str) -> String {
    // The pattern is a literal and always compiles.
    let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern");

    re.replace_all(content, |cap: &regex::Captures<'_>| {
        std::env::var(&cap[1]).unwrap_or_default()
    })
    .into_owned()
}
