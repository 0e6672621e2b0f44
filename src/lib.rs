//! IP risk report.
//!
//! Answers "what is known about this IP address?" by querying Scamalytics
//! and folding its per-source fragments into one [`Report`].
//!
//! # Features
//!
//! - **Credential rotation** - Spread lookups round-robin over several accounts
//! - **Quota tracking** - Remember each account's self-reported remaining credits
//! - **Geolocation selection** - Pick one source by priority, never mix sources
//! - **Blacklist verdicts** - Per-list results plus a strict "clean everywhere" flag
//! - **Anonymizer detection** - VPN, Tor, datacenter, proxy and bot signals OR-ed across sources
//! - **Classified errors** - Connectivity, provider and internal failures kept apart
//!
//! # Example Configuration
//!
//! ```yaml
//! provider:
//!   timeout_ms: 10000
//!
//! credentials:
//!   - user: "${SCAMALYTICS_USER}"
//!     api_key: "${SCAMALYTICS_API_KEY}"
//!
//! thresholds:
//!   quota:
//!     plentiful: 500
//!     adequate: 100
//!     low: 20
//! ```

pub mod aggregator;
pub mod config;
pub mod credentials;
pub mod providers;
pub mod render;
pub mod report;
pub mod service;

pub use config::Config;
pub use providers::{ErrorCategory, LookupError};
pub use report::Report;
pub use service::LookupService;
