//! Prometheus metrics for the store and the features built on it.
//!
//! Counters are always recorded through the `metrics` facade; they are only
//! exported when [`MetricsServer::start`] has installed a recorder.
//!
//! # Example
//!
//! ```rust,no_run
//! use searchbox_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MetricsServer::new("127.0.0.1:9090".parse()?);
//! server.start()?;
//! // Metrics available at http://127.0.0.1:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build or install the Prometheus exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
}

impl MetricsServer {
    /// Create a new metrics server bound to `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Register metric descriptions and start the HTTP exporter.
    ///
    /// Must be called from within a tokio runtime; the listener is spawned
    /// onto it.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Install`] if the exporter cannot be built or a
    /// different recorder is already installed.
    pub fn start(&self) -> Result<(), MetricsError> {
        register_metrics();

        match PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .install()
        {
            Ok(()) => {
                tracing::info!(
                    addr = %self.addr,
                    "Metrics server started - available at http://{}/metrics",
                    self.addr
                );
                Ok(())
            },
            Err(e) => Err(MetricsError::Install(e.to_string())),
        }
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Store
    describe_counter!("store.actions.sent", "Actions dispatched into a store");
    describe_counter!(
        "store.actions.rejected",
        "Actions rejected because the store was shutting down"
    );
    describe_counter!(
        "store.effects.executed",
        "Effects executed by a store, labelled by effect type"
    );

    // Search feature
    describe_counter!("search.queries.started", "Fetches started for a changed query");
    describe_counter!(
        "search.responses.stale",
        "Responses dropped because a newer query superseded them"
    );
    describe_counter!("search.fetch.failed", "Fetches that settled with an error");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_error_message_is_descriptive() {
        let error = MetricsError::Install("recorder already set".to_string());
        assert_eq!(
            error.to_string(),
            "Failed to install metrics exporter: recorder already set"
        );
    }
}
