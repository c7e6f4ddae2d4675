//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_topology_stakers` (gauge): stakers in the last fetched topology
//! - `gateway_topology_fetch_total` (counter): fetches by result (ok, error)
//! - `gateway_entries_skipped_total` (counter): skipped entries by reason
//! - `gateway_config_applied_total` (counter): promoted configs by trigger
//! - `gateway_config_rejected_total` (counter): rejected configs by trigger

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_topology_fetch(ok: bool, stakers: Option<usize>) {
    let result = if ok { "ok" } else { "error" };
    counter!("gateway_topology_fetch_total", "result" => result).increment(1);
    if let Some(stakers) = stakers {
        gauge!("gateway_topology_stakers").set(stakers as f64);
    }
}

pub fn record_entry_skipped(reason: &'static str) {
    counter!("gateway_entries_skipped_total", "reason" => reason).increment(1);
}

pub fn record_config_applied(trigger: &'static str) {
    counter!("gateway_config_applied_total", "trigger" => trigger).increment(1);
}

pub fn record_config_rejected(trigger: &'static str) {
    counter!("gateway_config_rejected_total", "trigger" => trigger).increment(1);
}
