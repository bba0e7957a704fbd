//! ---
//! rc_section: "03-persistence-logging"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Append-only history of sizing calculations."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::{IntCounter, Opts, Registry};

use crate::Result;

/// Metrics published by the history subsystem.
#[derive(Clone)]
pub struct HistoryMetrics {
    appends: IntCounter,
    append_failures: IntCounter,
    bytes_written: IntCounter,
    #[allow(dead_code)]
    registry: Arc<Registry>,
}

impl HistoryMetrics {
    /// Register all history metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> Result<Self> {
        let appends = IntCounter::with_opts(Opts::new(
            "r_cable_history_appends_total",
            "Total number of calculations recorded in history",
        ))?;
        registry.register(Box::new(appends.clone()))?;

        let append_failures = IntCounter::with_opts(Opts::new(
            "r_cable_history_append_failures_total",
            "Total number of history appends that failed",
        ))?;
        registry.register(Box::new(append_failures.clone()))?;

        let bytes_written = IntCounter::with_opts(Opts::new(
            "r_cable_history_bytes_total",
            "Total bytes appended to the history log",
        ))?;
        registry.register(Box::new(bytes_written.clone()))?;

        Ok(Self {
            appends,
            append_failures,
            bytes_written,
            registry,
        })
    }

    /// Record a successful append of `bytes` bytes.
    pub fn record_append(&self, bytes: usize) {
        self.appends.inc();
        self.bytes_written.inc_by(bytes as u64);
    }

    /// Record a failed append.
    pub fn record_failure(&self) {
        self.append_failures.inc();
    }

    /// Number of successful appends so far.
    pub fn appends(&self) -> u64 {
        self.appends.get()
    }
}

impl std::fmt::Debug for HistoryMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_counts() {
        let registry = Arc::new(Registry::new());
        let metrics = HistoryMetrics::new(registry.clone()).unwrap();
        metrics.record_append(120);
        metrics.record_append(80);
        metrics.record_failure();
        assert_eq!(metrics.appends(), 2);

        let families = registry.gather();
        let bytes = families
            .iter()
            .find(|family| family.get_name() == "r_cable_history_bytes_total")
            .unwrap();
        assert_eq!(bytes.get_metric()[0].get_counter().get_value(), 200.0);
    }

    #[test]
    fn double_registration_fails() {
        let registry = Arc::new(Registry::new());
        HistoryMetrics::new(registry.clone()).unwrap();
        assert!(HistoryMetrics::new(registry).is_err());
    }
}
