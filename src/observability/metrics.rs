//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edgeguard_admission_total` (counter): admission decisions by outcome
//! - `edgeguard_lifecycle_state` (gauge): 0=created, 1=listening,
//!   2=shutting_down, 3=stopped
//!
//! Recording is a no-op until [`init_metrics`] installs an exporter.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::LifecycleState;

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_admission(granted: bool) {
    let outcome = if granted { "granted" } else { "rejected" };
    ::metrics::counter!("edgeguard_admission_total", "outcome" => outcome).increment(1);
}

pub fn record_lifecycle_state(state: LifecycleState) {
    ::metrics::gauge!("edgeguard_lifecycle_state").set(state as u8 as f64);
}
