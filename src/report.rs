//! Normalized lookup report.

use crate::config::{QuotaThresholds, ScoreThresholds};
use serde::Serialize;

/// Location fields from a single source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeoRecord {
    pub country_name: Option<String>,
    pub country_code: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
}

impl GeoRecord {
    pub fn has_country(&self) -> bool {
        self.country_name.is_some()
    }

    /// Country plus at least one finer locality.
    pub fn is_qualified(&self) -> bool {
        self.has_country()
            && (self.city.is_some() || self.state.is_some() || self.district.is_some())
    }
}

/// Geolocation chosen for the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Geolocation {
    /// First source with a country and locality detail.
    Qualified { source: String, record: GeoRecord },
    /// No source had locality detail; first source with a country.
    CountryOnly { source: String, record: GeoRecord },
    Unavailable,
}

impl Geolocation {
    pub fn record(&self) -> Option<&GeoRecord> {
        match self {
            Geolocation::Qualified { record, .. } | Geolocation::CountryOnly { record, .. } => {
                Some(record)
            }
            Geolocation::Unavailable => None,
        }
    }

    pub fn source(&self) -> Option<&str> {
        match self {
            Geolocation::Qualified { source, .. } | Geolocation::CountryOnly { source, .. } => {
                Some(source)
            }
            Geolocation::Unavailable => None,
        }
    }
}

/// Verdict of one blacklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlacklistVerdict {
    /// Source key in the provider response.
    pub list: String,
    /// Display name.
    pub label: String,
    /// Whether the list reported a verdict at all.
    pub responded: bool,
    pub listed: bool,
}

/// All blacklist verdicts for one IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blacklists {
    pub verdicts: Vec<BlacklistVerdict>,
    /// Every list responded and none listed the IP.
    pub clean: bool,
}

impl Blacklists {
    pub fn any_listed(&self) -> bool {
        self.verdicts.iter().any(|v| v.listed)
    }

    pub fn get(&self, list: &str) -> Option<&BlacklistVerdict> {
        self.verdicts.iter().find(|v| v.list == list)
    }
}

/// Anonymizer category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnonymizerCategory {
    Vpn,
    Tor,
    Datacenter,
    PublicProxy,
    WebProxy,
    SearchEngineBot,
}

impl AnonymizerCategory {
    pub fn label(&self) -> &'static str {
        match self {
            AnonymizerCategory::Vpn => "VPN",
            AnonymizerCategory::Tor => "Tor exit node",
            AnonymizerCategory::Datacenter => "Datacenter / hosting",
            AnonymizerCategory::PublicProxy => "Public proxy",
            AnonymizerCategory::WebProxy => "Web proxy",
            AnonymizerCategory::SearchEngineBot => "Search engine bot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnonymizerVerdict {
    pub category: AnonymizerCategory,
    pub detected: bool,
}

/// Per-category anonymizer verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anonymizers {
    pub verdicts: Vec<AnonymizerVerdict>,
}

impl Anonymizers {
    pub fn is_detected(&self, category: AnonymizerCategory) -> bool {
        self.verdicts
            .iter()
            .any(|v| v.category == category && v.detected)
    }

    pub fn detected(&self) -> impl Iterator<Item = AnonymizerCategory> + '_ {
        self.verdicts.iter().filter(|v| v.detected).map(|v| v.category)
    }

    pub fn none_detected(&self) -> bool {
        self.verdicts.iter().all(|v| !v.detected)
    }
}

/// Qualitative fraud score tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ScoreTier {
    pub fn from_score(score: u32, thresholds: &ScoreThresholds) -> Self {
        if score >= thresholds.very_high {
            ScoreTier::VeryHigh
        } else if score >= thresholds.high {
            ScoreTier::High
        } else if score >= thresholds.medium {
            ScoreTier::Medium
        } else {
            ScoreTier::Low
        }
    }
}

/// Qualitative remaining-quota tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaTier {
    Plentiful,
    Adequate,
    Low,
    Critical,
}

impl QuotaTier {
    pub fn from_remaining(remaining: u64, thresholds: &QuotaThresholds) -> Self {
        if remaining > thresholds.plentiful {
            QuotaTier::Plentiful
        } else if remaining > thresholds.adequate {
            QuotaTier::Adequate
        } else if remaining > thresholds.low {
            QuotaTier::Low
        } else {
            QuotaTier::Critical
        }
    }
}

/// Result of one IP lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub ip: String,
    pub score: Option<u32>,
    pub score_tier: Option<ScoreTier>,
    /// Upper-cased provider risk label.
    pub risk: Option<String>,
    pub geolocation: Geolocation,
    pub blacklists: Blacklists,
    pub anonymizers: Anonymizers,
    pub detail_url: Option<String>,
    /// Credential that made the lookup.
    pub credential: String,
    /// Remaining queries summed over all credentials.
    pub quota_remaining: u64,
    pub quota_tier: QuotaTier,
}

impl Report {
    pub fn risk_label(&self) -> &str {
        self.risk.as_deref().unwrap_or("unknown")
    }
}
