//! Prometheus metrics infrastructure for the irisfinder service.
//!
//! This module provides:
//! - [`MetricsConfig`]: Configuration for the metrics system
//! - [`init_metrics`]: Install the Prometheus recorder and its scrape listener
//! - Business metric helpers for IRIS searches
//!
//! The exporter serves `/metrics` on its own port so the API router keeps a
//! single route.
//!
//! # Example
//!
//! ```no_run
//! use irisfinder_service_shared::metrics::{MetricsConfig, init_metrics};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = MetricsConfig::default();
//! init_metrics(&config).expect("failed to initialize metrics");
//! # }
//! ```

use std::net::SocketAddr;

use irisfinder_lib::{Error, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::{Deserialize, Serialize};

/// Port of the Prometheus scrape listener when `METRICS_PORT` is unset.
pub const DEFAULT_METRICS_PORT: u16 = 9000;

/// Configuration for the metrics system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled.
    pub enabled: bool,
    /// Port the Prometheus exporter listens on.
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: DEFAULT_METRICS_PORT,
        }
    }
}

impl MetricsConfig {
    /// Create configuration from environment variables.
    ///
    /// - `METRICS_ENABLED`: true/false, 1/0, yes/no or on/off (default: true)
    /// - `METRICS_PORT`: exporter port (default: 9000)
    ///
    /// # Errors
    ///
    /// Returns [`irisfinder_lib::Error::InvalidConfig`] for a value that does
    /// not parse, so start-up aborts instead of silently using a default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = match lookup("METRICS_ENABLED") {
            Some(value) => parse_flag(&value).ok_or_else(|| {
                Error::invalid_config(
                    "METRICS_ENABLED",
                    value.clone(),
                    "expected true or false",
                )
            })?,
            None => true,
        };

        let port = match lookup("METRICS_PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| {
                Error::invalid_config("METRICS_PORT", value.clone(), "not a port number")
            })?,
            None => DEFAULT_METRICS_PORT,
        };

        Ok(Self { enabled, port })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Install the Prometheus recorder and start its HTTP listener.
///
/// Must be called from inside a tokio runtime, once, before any metric is
/// recorded. Without it the `metrics` macros are no-ops.
///
/// # Errors
///
/// Returns an error if metrics are disabled or the exporter cannot be
/// installed (for example when a recorder is already set or the port is taken).
pub fn init_metrics(config: &MetricsConfig) -> std::result::Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr())
        .install()
        .map_err(|e| MetricsError::InstallFailed(e.to_string()))
}

/// Errors that can occur during metrics initialization.
#[derive(Debug, Clone)]
pub enum MetricsError {
    /// Metrics are disabled in configuration.
    Disabled,
    /// The Prometheus builder failed to install.
    InstallFailed(String),
}

impl std::fmt::Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::Disabled => write!(f, "metrics are disabled"),
            MetricsError::InstallFailed(e) => {
                write!(f, "failed to install metrics recorder: {}", e)
            }
        }
    }
}

impl std::error::Error for MetricsError {}

// =============================================================================
// Business Metrics Helpers
// =============================================================================

/// Record a successful IRIS search.
///
/// Increments `irisfinder_searches_total` and records the candidate count and
/// page size histograms.
pub fn record_search_completed(total: i64, returned: usize) {
    metrics::counter!("irisfinder_searches_total").increment(1);
    metrics::histogram!("irisfinder_candidates_total").record(total.max(0) as f64);
    metrics::histogram!("irisfinder_zones_returned").record(returned as f64);
}

/// Record a failed IRIS search.
///
/// # Arguments
///
/// * `reason` - `"invalid_request"` or `"store_error"`
pub fn record_search_failed(reason: &str) {
    metrics::counter!(
        "irisfinder_searches_failed_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}
