//! IP risk report CLI.

use anyhow::Result;
use clap::Parser;
use ip_risk_report::render::{render_error, render_report};
use ip_risk_report::service::looks_like_ip;
use ip_risk_report::{Config, LookupService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ip-risk-report")]
#[command(about = "Look up IP addresses on Scamalytics and print a combined risk report")]
#[command(version)]
struct Args {
    /// IP addresses to look up
    #[arg(value_name = "IP", required_unless_present_any = ["print_config", "validate"])]
    ips: Vec<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "ip-risk-report.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "warn")]
    log_level: String,

    /// Print reports as JSON
    #[arg(long)]
    json: bool,

    /// Print example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --print-config
    if args.print_config {
        println!("{}", Config::example());
        return Ok(());
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    info!(config = %args.config.display(), "Loading configuration");
    let config = Config::load(&args.config)?;

    // Handle --validate
    if args.validate {
        info!("Configuration is valid");
        eprintln!("Configuration is valid");
        return Ok(());
    }

    let service = Arc::new(LookupService::from_config(&config)?);

    // Independent lookups run concurrently; output keeps input order.
    let handles: Vec<_> = args
        .ips
        .iter()
        .map(|input| {
            let ip = input.trim().to_string();
            let service = service.clone();
            tokio::spawn(async move {
                if !looks_like_ip(&ip) {
                    return (ip, None);
                }
                let result = service.lookup(&ip).await;
                (ip, Some(result))
            })
        })
        .collect();

    let mut failures = 0;
    let mut json_reports = Vec::new();
    for handle in handles {
        let (ip, outcome) = handle.await?;
        match outcome {
            None => {
                warn!(input = %ip, "Not an IP address");
                eprintln!("{}: not an IP address (example: 8.8.8.8)", ip);
                failures += 1;
            }
            Some(Ok(report)) => {
                if args.json {
                    json_reports.push(report);
                } else {
                    println!("{}\n", render_report(&report));
                }
            }
            Some(Err(e)) => {
                eprintln!("{}", render_error(&ip, &e));
                failures += 1;
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&json_reports)?);
    }

    if failures > 0 {
        anyhow::bail!("{} of {} lookups failed", failures, args.ips.len());
    }

    Ok(())
}
