//! Turns a raw provider response into a [`Report`].
//!
//! Every per-source rule lives in one of the tables below:
//!
//! - [`GEO_SOURCES`] and `GEO_RULES`: geolocation sources in priority order
//!   and the predicates a source must satisfy, strictest first. A source is
//!   taken wholesale; fields are never merged across sources.
//! - [`BLACKLISTS`]: the lists consulted and the verdict field of each.
//! - [`ANONYMIZER_INDICATORS`]: for each anonymizer category, the indicators
//!   that are OR-ed together.

use crate::config::Thresholds;
use crate::credentials::CredentialPool;
use crate::providers::{LookupError, RawLookupResult, SourceFields};
use crate::report::{
    AnonymizerCategory, AnonymizerVerdict, Anonymizers, BlacklistVerdict, Blacklists, GeoRecord,
    Geolocation, QuotaTier, Report, ScoreTier,
};
use serde_json::Value;
use tracing::debug;

/// Geolocation sources, highest priority first.
pub const GEO_SOURCES: &[&str] = &["dbip", "ipinfo", "maxmind_geolite2"];

#[derive(Debug, Clone, Copy)]
enum GeoTier {
    Qualified,
    CountryOnly,
}

/// Acceptance rules, strictest first. Each rule scans all sources in
/// priority order before the next rule is tried.
const GEO_RULES: &[(GeoTier, fn(&GeoRecord) -> bool)] = &[
    (GeoTier::Qualified, GeoRecord::is_qualified),
    (GeoTier::CountryOnly, GeoRecord::has_country),
];

/// A blacklist and the boolean field carrying its verdict.
pub struct BlacklistSource {
    pub list: &'static str,
    pub field: &'static str,
    pub label: &'static str,
}

pub const BLACKLISTS: &[BlacklistSource] = &[
    BlacklistSource {
        list: "firehol",
        field: "ip_blacklisted_30",
        label: "Firehol (30 days)",
    },
    BlacklistSource {
        list: "ip2proxy_lite",
        field: "ip_blacklisted",
        label: "IP2Proxy Lite",
    },
    BlacklistSource {
        list: "ipsum",
        field: "ip_blacklisted",
        label: "IPsum",
    },
    BlacklistSource {
        list: "spamhaus_drop",
        field: "ip_blacklisted",
        label: "Spamhaus DROP",
    },
    BlacklistSource {
        list: "x4bnet",
        field: "is_blacklisted_spambot",
        label: "X4Bnet Spambot",
    },
];

/// Where an indicator field lives.
#[derive(Debug, Clone, Copy)]
pub enum Origin {
    /// The provider's own proxy block.
    Provider,
    /// A named external data source.
    External(&'static str),
}

/// A single raw signal contributing to an anonymizer category.
#[derive(Debug, Clone, Copy)]
pub enum Indicator {
    /// Boolean field that is true.
    Flag {
        origin: Origin,
        field: &'static str,
    },
    /// String field equal to one of `values`.
    OneOf {
        origin: Origin,
        field: &'static str,
        values: &'static [&'static str],
    },
}

const fn flag(origin: Origin, field: &'static str) -> Indicator {
    Indicator::Flag { origin, field }
}

const fn one_of(origin: Origin, field: &'static str, values: &'static [&'static str]) -> Indicator {
    Indicator::OneOf {
        origin,
        field,
        values,
    }
}

const X4BNET: Origin = Origin::External("x4bnet");
const IP2PROXY: Origin = Origin::External("ip2proxy");
const IP2PROXY_LITE: Origin = Origin::External("ip2proxy_lite");
const GOOGLE: Origin = Origin::External("google");

const VPN_TYPES: &[&str] = &["VPN"];
const PUBLIC_PROXY_TYPES: &[&str] = &["PUB", "PUB,WEB"];
const WEB_PROXY_TYPES: &[&str] = &["WEB"];

/// Anonymizer categories in report order, with their indicators.
pub const ANONYMIZER_INDICATORS: &[(AnonymizerCategory, &[Indicator])] = &[
    (
        AnonymizerCategory::Vpn,
        &[
            flag(Origin::Provider, "is_vpn"),
            flag(X4BNET, "is_vpn"),
            one_of(IP2PROXY, "proxy_type", VPN_TYPES),
            one_of(IP2PROXY_LITE, "proxy_type", VPN_TYPES),
        ],
    ),
    (
        AnonymizerCategory::Tor,
        &[flag(Origin::Provider, "is_tor"), flag(X4BNET, "is_tor")],
    ),
    (
        AnonymizerCategory::Datacenter,
        &[
            flag(Origin::Provider, "is_datacenter"),
            flag(Origin::Provider, "is_amazon_aws"),
            flag(Origin::Provider, "is_google"),
        ],
    ),
    (
        AnonymizerCategory::PublicProxy,
        &[
            one_of(IP2PROXY, "proxy_type", PUBLIC_PROXY_TYPES),
            one_of(IP2PROXY_LITE, "proxy_type", PUBLIC_PROXY_TYPES),
        ],
    ),
    (
        AnonymizerCategory::WebProxy,
        &[
            one_of(IP2PROXY, "proxy_type", WEB_PROXY_TYPES),
            one_of(IP2PROXY_LITE, "proxy_type", WEB_PROXY_TYPES),
        ],
    ),
    (
        AnonymizerCategory::SearchEngineBot,
        &[
            flag(Origin::Provider, "is_google"),
            flag(GOOGLE, "is_googlebot"),
        ],
    ),
];

/// Builds reports from raw lookups.
#[derive(Debug, Clone, Default)]
pub struct ReportAggregator {
    thresholds: Thresholds,
}

impl ReportAggregator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Build the report for `ip`, looked up with credential `credential_id`.
    ///
    /// The lookup's remaining-quota figure is recorded in `pool` before the
    /// aggregate is read. Nothing is recorded when the raw data is malformed.
    pub fn build(
        &self,
        ip: &str,
        raw: &RawLookupResult,
        credential_id: &str,
        pool: &CredentialPool,
    ) -> Result<Report, LookupError> {
        let geolocation = select_geolocation(raw)?;
        let blacklists = blacklist_verdicts(raw)?;
        let anonymizers = anonymizer_verdicts(raw)?;

        if let Some(remaining) = raw.quota_remaining {
            pool.record_quota(credential_id, remaining);
        }
        let quota_remaining = pool.total_remaining();

        let risk = raw
            .risk
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_uppercase);

        debug!(
            ip = %ip,
            geo_source = ?geolocation.source(),
            clean = blacklists.clean,
            anonymized = !anonymizers.none_detected(),
            quota_remaining,
            "Report built"
        );

        Ok(Report {
            ip: ip.to_string(),
            score: raw.score,
            score_tier: raw
                .score
                .map(|s| ScoreTier::from_score(s, &self.thresholds.score)),
            risk,
            geolocation,
            blacklists,
            anonymizers,
            detail_url: raw.detail_url.clone().filter(|u| !u.is_empty()),
            credential: credential_id.to_string(),
            quota_remaining,
            quota_tier: QuotaTier::from_remaining(quota_remaining, &self.thresholds.quota),
        })
    }
}

/// Pick the geolocation by rule, then by source priority.
///
/// Sources are decoded only when a rule reaches them, so nothing past the
/// winning source is read.
fn select_geolocation(raw: &RawLookupResult) -> Result<Geolocation, LookupError> {
    let mut records: Vec<Option<GeoRecord>> = vec![None; GEO_SOURCES.len()];

    for (tier, accepts) in GEO_RULES {
        for (i, &source) in GEO_SOURCES.iter().enumerate() {
            let Some(fields) = raw.source(source) else {
                continue;
            };
            let record = match &mut records[i] {
                Some(record) => record,
                slot => slot.insert(geo_record(source, fields)?),
            };
            if !accepts(&*record) {
                continue;
            }

            let source = source.to_string();
            let record = record.clone();
            return Ok(match tier {
                GeoTier::Qualified => Geolocation::Qualified { source, record },
                GeoTier::CountryOnly => Geolocation::CountryOnly { source, record },
            });
        }
    }

    Ok(Geolocation::Unavailable)
}

fn geo_record(source: &str, fields: &SourceFields) -> Result<GeoRecord, LookupError> {
    let text = |field: &str| geo_text(source, field, fields.get(field));
    Ok(GeoRecord {
        country_name: text("ip_country_name")?,
        country_code: text("ip_country_code")?,
        state: text("ip_state_name")?,
        district: text("ip_district_name")?,
        city: text("ip_city")?,
        postcode: text("ip_postcode")?,
    })
}

/// A geo field as non-empty text. Numbers are accepted (postcodes).
fn geo_text(source: &str, field: &str, value: Option<&Value>) -> Result<Option<String>, LookupError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(shape_error(source, field, "text", other)),
    }
}

fn blacklist_verdicts(raw: &RawLookupResult) -> Result<Blacklists, LookupError> {
    let mut verdicts = Vec::with_capacity(BLACKLISTS.len());
    for entry in BLACKLISTS {
        let value = raw.source(entry.list).and_then(|f| f.get(entry.field));
        let verdict = optional_bool(entry.list, entry.field, value)?;
        verdicts.push(BlacklistVerdict {
            list: entry.list.to_string(),
            label: entry.label.to_string(),
            responded: verdict.is_some(),
            listed: verdict.unwrap_or(false),
        });
    }

    let clean = verdicts.iter().all(|v| v.responded && !v.listed);
    Ok(Blacklists { verdicts, clean })
}

fn anonymizer_verdicts(raw: &RawLookupResult) -> Result<Anonymizers, LookupError> {
    let mut verdicts = Vec::with_capacity(ANONYMIZER_INDICATORS.len());
    for (category, indicators) in ANONYMIZER_INDICATORS {
        let mut detected = false;
        // Evaluate every indicator so malformed fields are always reported.
        for indicator in indicators.iter() {
            detected |= indicator_fires(raw, indicator)?;
        }
        verdicts.push(AnonymizerVerdict {
            category: *category,
            detected,
        });
    }
    Ok(Anonymizers { verdicts })
}

/// Source name and value of an indicator field.
fn locate<'a>(raw: &'a RawLookupResult, origin: Origin, field: &str) -> (&'static str, Option<&'a Value>) {
    match origin {
        Origin::Provider => ("scamalytics_proxy", raw.proxy.get(field)),
        Origin::External(source) => (source, raw.source(source).and_then(|f| f.get(field))),
    }
}

fn indicator_fires(raw: &RawLookupResult, indicator: &Indicator) -> Result<bool, LookupError> {
    match *indicator {
        Indicator::Flag { origin, field } => {
            let (source, value) = locate(raw, origin, field);
            Ok(optional_bool(source, field, value)?.unwrap_or(false))
        }
        Indicator::OneOf {
            origin,
            field,
            values,
        } => {
            let (source, value) = locate(raw, origin, field);
            match value {
                None | Some(Value::Null) => Ok(false),
                Some(Value::String(s)) => Ok(values.contains(&s.trim())),
                Some(other) => Err(shape_error(source, field, "text", other)),
            }
        }
    }
}

fn optional_bool(source: &str, field: &str, value: Option<&Value>) -> Result<Option<bool>, LookupError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(shape_error(source, field, "a boolean", other)),
    }
}

fn shape_error(source: &str, field: &str, expected: &str, got: &Value) -> LookupError {
    LookupError::InternalContract(format!(
        "{}.{}: expected {}, got {}",
        source, field, expected, got
    ))
}
