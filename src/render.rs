//! Plain-text rendering of reports and lookup errors.

use crate::providers::LookupError;
use crate::report::{Geolocation, QuotaTier, Report, ScoreTier};
use std::fmt::Write;

fn score_marker(tier: Option<ScoreTier>) -> &'static str {
    match tier {
        Some(ScoreTier::Low) => "[ok]",
        Some(ScoreTier::Medium) => "[!]",
        Some(ScoreTier::High) => "[!!]",
        Some(ScoreTier::VeryHigh) => "[!!!]",
        None => "[?]",
    }
}

fn quota_marker(tier: QuotaTier) -> &'static str {
    match tier {
        QuotaTier::Plentiful => "plentiful",
        QuotaTier::Adequate => "adequate",
        QuotaTier::Low => "low",
        QuotaTier::Critical => "critical",
    }
}

/// Render a report as multi-line text.
pub fn render_report(report: &Report) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &Report) -> std::fmt::Result {
    writeln!(out, "IP: {}", report.ip)?;
    match report.score {
        Some(score) => writeln!(
            out,
            "Fraud score: {} / 100 {}",
            score,
            score_marker(report.score_tier)
        )?,
        None => writeln!(out, "Fraud score: unknown")?,
    }
    writeln!(out, "Risk: {}", report.risk_label())?;

    writeln!(out)?;
    writeln!(out, "Location:")?;
    if let Some(record) = report.geolocation.record() {
        writeln!(
            out,
            "  Country: {} ({})",
            record.country_name.as_deref().unwrap_or("-"),
            record.country_code.as_deref().unwrap_or("-")
        )?;
    }
    match &report.geolocation {
        Geolocation::Qualified { source, record } => {
            let details = [
                ("State / province", &record.state),
                ("District", &record.district),
                ("City", &record.city),
                ("Postcode", &record.postcode),
            ];
            for (label, value) in details {
                if let Some(value) = value {
                    writeln!(out, "  {}: {}", label, value)?;
                }
            }
            writeln!(out, "  (source: {})", source)?;
        }
        Geolocation::CountryOnly { source, .. } => {
            writeln!(out, "  (source: {}, no further details)", source)?;
        }
        Geolocation::Unavailable => writeln!(out, "  no location data available")?,
    }

    writeln!(out)?;
    writeln!(out, "Blacklists:")?;
    for verdict in &report.blacklists.verdicts {
        let state = match (verdict.responded, verdict.listed) {
            (_, true) => "LISTED",
            (true, false) => "clean",
            (false, false) => "no data",
        };
        writeln!(out, "  {}: {}", verdict.label, state)?;
    }
    if report.blacklists.clean {
        writeln!(out, "  This IP was not found in any known blacklist")?;
    }

    writeln!(out)?;
    writeln!(out, "Proxies / anonymizers:")?;
    if report.anonymizers.none_detected() {
        writeln!(out, "  no anonymizers or proxies detected")?;
    } else {
        for category in report.anonymizers.detected() {
            writeln!(out, "  {}: detected", category.label())?;
        }
    }

    if let Some(url) = &report.detail_url {
        writeln!(out)?;
        writeln!(out, "Details: {}", url)?;
    }

    writeln!(out)?;
    write!(
        out,
        "Requests remaining: {} ({})",
        report.quota_remaining,
        quota_marker(report.quota_tier)
    )?;

    Ok(())
}

/// Render a failed lookup as a short message for the end user.
pub fn render_error(ip: &str, error: &LookupError) -> String {
    let detail = match error {
        LookupError::Connectivity(_) | LookupError::InternalContract(_) => String::new(),
        LookupError::ProviderHttp { code } => format!(" (HTTP {})", code),
        LookupError::ProviderLogical { message } => format!(": {}", message),
    };
    format!("{}: {}{}", ip, error.category().message(), detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{
        AnonymizerCategory, AnonymizerVerdict, Anonymizers, BlacklistVerdict, Blacklists,
        GeoRecord,
    };

    fn report() -> Report {
        Report {
            ip: "8.8.8.8".to_string(),
            score: Some(5),
            score_tier: Some(ScoreTier::Low),
            risk: Some("LOW".to_string()),
            geolocation: Geolocation::Qualified {
                source: "ipinfo".to_string(),
                record: GeoRecord {
                    country_name: Some("United States".to_string()),
                    country_code: Some("US".to_string()),
                    city: Some("Mountain View".to_string()),
                    ..Default::default()
                },
            },
            blacklists: Blacklists {
                verdicts: vec![
                    BlacklistVerdict {
                        list: "ipsum".to_string(),
                        label: "IPsum".to_string(),
                        responded: true,
                        listed: false,
                    },
                    BlacklistVerdict {
                        list: "x4bnet".to_string(),
                        label: "X4Bnet Spambot".to_string(),
                        responded: false,
                        listed: false,
                    },
                ],
                clean: false,
            },
            anonymizers: Anonymizers {
                verdicts: vec![AnonymizerVerdict {
                    category: AnonymizerCategory::Vpn,
                    detected: false,
                }],
            },
            detail_url: Some("https://scamalytics.com/ip/8.8.8.8".to_string()),
            credential: "alice".to_string(),
            quota_remaining: 900,
            quota_tier: QuotaTier::Plentiful,
        }
    }

    #[test]
    fn test_render_report() {
        let text = render_report(&report());
        assert!(text.starts_with("IP: 8.8.8.8\n"));
        assert!(text.contains("Fraud score: 5 / 100 [ok]"));
        assert!(text.contains("Risk: LOW"));
        assert!(text.contains("  Country: United States (US)"));
        assert!(text.contains("  City: Mountain View"));
        assert!(!text.contains("Postcode"));
        assert!(text.contains("(source: ipinfo)"));
        assert!(text.contains("  IPsum: clean"));
        assert!(text.contains("  X4Bnet Spambot: no data"));
        assert!(!text.contains("not found in any known blacklist"));
        assert!(text.contains("no anonymizers or proxies detected"));
        assert!(text.contains("Details: https://scamalytics.com/ip/8.8.8.8"));
        assert!(text.ends_with("Requests remaining: 900 (plentiful)"));
    }

    #[test]
    fn test_render_detected_and_unavailable() {
        let mut report = report();
        report.score = None;
        report.score_tier = None;
        report.risk = None;
        report.geolocation = Geolocation::Unavailable;
        report.anonymizers.verdicts[0].detected = true;
        report.blacklists.clean = true;

        let text = render_report(&report);
        assert!(text.contains("Fraud score: unknown"));
        assert!(text.contains("Risk: unknown"));
        assert!(text.contains("no location data available"));
        assert!(text.contains("  VPN: detected"));
        assert!(text.contains("not found in any known blacklist"));
    }

    #[test]
    fn test_render_country_only() {
        let mut report = report();
        report.geolocation = Geolocation::CountryOnly {
            source: "dbip".to_string(),
            record: GeoRecord {
                country_name: Some("Japan".to_string()),
                ..Default::default()
            },
        };
        let text = render_report(&report);
        assert!(text.contains("  Country: Japan (-)"));
        assert!(text.contains("(source: dbip, no further details)"));
    }

    #[test]
    fn test_render_errors() {
        assert_eq!(
            render_error("8.8.8.8", &LookupError::ProviderHttp { code: 403 }),
            "8.8.8.8: The reputation provider rejected the request (HTTP 403)"
        );
        assert_eq!(
            render_error(
                "8.8.8.8",
                &LookupError::ProviderLogical {
                    message: "invalid key".to_string()
                }
            ),
            "8.8.8.8: The reputation provider rejected the request: invalid key"
        );
        assert_eq!(
            render_error("8.8.8.8", &LookupError::Connectivity("refused".to_string())),
            "8.8.8.8: Could not reach the reputation provider"
        );
        assert!(render_error("8.8.8.8", &LookupError::InternalContract("x".to_string()))
            .contains("Something went wrong"));
    }
}
