//! ---
//! rc_section: "03-persistence-logging"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Metrics collection and export utilities."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{response::IntoResponse, Router};
use prometheus::{
    GaugeVec, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shared registry type used across services.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Router exposing the registry at `/metrics`, for mounting on another server.
pub fn metrics_router(registry: SharedRegistry) -> Router {
    Router::new().route(
        "/metrics",
        get(move || metrics_handler(registry.clone())),
    )
}

/// Spawn an HTTP server that exposes the registry at `/metrics`.
pub fn spawn_http_server(registry: SharedRegistry, addr: SocketAddr) -> Result<MetricsServer> {
    let app = metrics_router(registry);

    let std_listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind metrics listener {}", addr))?;
    std_listener
        .set_nonblocking(true)
        .with_context(|| "failed to configure metrics listener as non-blocking")?;
    let bound = std_listener
        .local_addr()
        .with_context(|| "failed to read metrics listener address")?;
    let listener = TcpListener::from_std(std_listener)
        .with_context(|| "failed to convert std listener into tokio listener")?;

    info!(address = %bound, "metrics server starting");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let service = app.into_make_service();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("metrics server encountered an error")?;
        Ok(())
    });

    Ok(MetricsServer {
        addr: bound,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

/// Prometheus scrape endpoint.
async fn metrics_handler(registry: SharedRegistry) -> impl IntoResponse {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(prometheus::TEXT_FORMAT),
            )],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("metrics encoding error"),
            )
                .into_response()
        }
    }
}

/// Handle to the running HTTP exporter.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl MetricsServer {
    /// Bound address; differs from the requested one when port 0 was used.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and await task completion.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(anyhow::Error::new(join_err)),
        }
    }
}

/// Metrics recorded by the daemon process itself.
#[derive(Clone)]
pub struct DaemonMetrics {
    registry: SharedRegistry,
    starts_total: IntCounter,
    config_load_seconds: Histogram,
    build_info: GaugeVec,
}

impl DaemonMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let starts_total = IntCounter::with_opts(Opts::new(
            "r_cabled_starts_total",
            "Total number of times the R-CABLE daemon has initialised",
        ))?;
        registry.register(Box::new(starts_total.clone()))?;

        let buckets = prometheus::exponential_buckets(0.001, 2.0, 16)
            .context("failed to construct histogram buckets")?;
        let config_load_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "r_cabled_config_load_seconds",
                "Time spent loading configuration and reference tables",
            )
            .buckets(buckets),
        )?;
        registry.register(Box::new(config_load_seconds.clone()))?;

        let build_info = GaugeVec::new(
            Opts::new(
                "r_cabled_build_info",
                "Build metadata for the running daemon binary",
            ),
            &["version", "profile"],
        )?;
        registry.register(Box::new(build_info.clone()))?;

        Ok(Self {
            registry,
            starts_total,
            config_load_seconds,
            build_info,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn inc_start(&self) {
        self.starts_total.inc();
    }

    pub fn observe_config_load(&self, seconds: f64) {
        self.config_load_seconds.observe(seconds);
    }

    pub fn set_build_info(&self, version: &str, profile: &str) {
        self.build_info
            .with_label_values(&[version, profile])
            .set(1.0);
    }
}

impl std::fmt::Debug for DaemonMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonMetrics").finish_non_exhaustive()
    }
}

/// Outcome label attached to calculation counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcOutcome {
    Ok,
    Validation,
    NotFound,
    Unsatisfiable,
    Internal,
}

impl CalcOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalcOutcome::Ok => "ok",
            CalcOutcome::Validation => "validation",
            CalcOutcome::NotFound => "not_found",
            CalcOutcome::Unsatisfiable => "unsatisfiable",
            CalcOutcome::Internal => "internal",
        }
    }
}

/// Counters and latency histograms for sizing calculations.
#[derive(Clone)]
pub struct CalcMetrics {
    calculations: IntCounterVec,
    duration_seconds: HistogramVec,
}

impl CalcMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let calculations = IntCounterVec::new(
            Opts::new(
                "r_cable_calculations_total",
                "Sizing calculations served, by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(calculations.clone()))?;

        let buckets = prometheus::exponential_buckets(0.000_05, 2.0, 14)
            .context("failed to construct histogram buckets")?;
        let duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "r_cable_calculation_duration_seconds",
                "Wall time spent inside the calculator",
            )
            .buckets(buckets),
            &["operation"],
        )?;
        registry.register(Box::new(duration_seconds.clone()))?;

        Ok(Self {
            calculations,
            duration_seconds,
        })
    }

    pub fn record(&self, operation: &str, outcome: CalcOutcome, seconds: f64) {
        self.calculations
            .with_label_values(&[operation, outcome.as_str()])
            .inc();
        self.duration_seconds
            .with_label_values(&[operation])
            .observe(seconds);
    }

    pub fn count(&self, operation: &str, outcome: CalcOutcome) -> u64 {
        self.calculations
            .with_label_values(&[operation, outcome.as_str()])
            .get()
    }
}

impl std::fmt::Debug for CalcMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalcMetrics").finish_non_exhaustive()
    }
}

pub use prometheus;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calc_metrics_count_by_label() {
        let registry = new_registry();
        let metrics = CalcMetrics::new(&registry).unwrap();
        metrics.record("current", CalcOutcome::Ok, 0.0004);
        metrics.record("current", CalcOutcome::Ok, 0.0002);
        metrics.record("voltage_drop", CalcOutcome::Unsatisfiable, 0.001);
        assert_eq!(metrics.count("current", CalcOutcome::Ok), 2);
        assert_eq!(metrics.count("voltage_drop", CalcOutcome::Unsatisfiable), 1);
        assert_eq!(metrics.count("voltage_drop", CalcOutcome::Ok), 0);
    }

    #[test]
    fn daemon_metrics_register_once() {
        let registry = new_registry();
        let metrics = DaemonMetrics::new(registry.clone()).unwrap();
        metrics.inc_start();
        metrics.set_build_info("0.1.0", "debug");
        assert!(DaemonMetrics::new(registry).is_err());
    }

    #[tokio::test]
    async fn exporter_serves_text_format() {
        let registry = new_registry();
        let metrics = CalcMetrics::new(&registry).unwrap();
        metrics.record("size", CalcOutcome::Ok, 0.001);

        let server = spawn_http_server(registry, "127.0.0.1:0".parse().unwrap()).unwrap();
        assert_ne!(server.addr().port(), 0);
        let body = reqwest::get(format!("http://{}/metrics", server.addr()))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("r_cable_calculations_total"));
        assert!(body.contains("operation=\"size\""));
        server.shutdown().await.unwrap();
    }
}
