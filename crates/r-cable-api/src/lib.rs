//! ---
//! rc_section: "05-networking-external-interfaces"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "REST surface for conductor sizing."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
//! JSON API over the calculator, the reference tables and the calculation
//! history.

use std::fmt;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use r_cable_calc::Calculator;
use r_cable_common::version::VersionInfo;
use r_cable_common::MAX_RECENT_LIMIT;
use r_cable_history::{HistoryRecorder, DEFAULT_RECENT_LIMIT};
use r_cable_metrics::CalcMetrics;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub mod error;
mod handlers;

pub use error::{ApiError, ErrorResponse};
pub use handlers::{HistoryQuery, StatusResponse};

/// Shared API state exposed to handlers.
pub struct ApiState {
    calculator: Calculator,
    history: Arc<dyn HistoryRecorder>,
    metrics: Option<CalcMetrics>,
    version: VersionInfo,
    start: Instant,
    recent_limit: usize,
}

impl ApiState {
    pub fn new(
        calculator: Calculator,
        history: Arc<dyn HistoryRecorder>,
        version: VersionInfo,
    ) -> Self {
        Self {
            calculator,
            history,
            metrics: None,
            version,
            start: Instant::now(),
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }

    pub fn with_metrics(mut self, metrics: CalcMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Default history page size; clamped to `1..=MAX_RECENT_LIMIT`.
    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit.clamp(1, MAX_RECENT_LIMIT);
        self
    }

    pub fn calculator(&self) -> &Calculator {
        &self.calculator
    }

    pub fn history(&self) -> &Arc<dyn HistoryRecorder> {
        &self.history
    }
}

impl fmt::Debug for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiState")
            .field("version", &self.version)
            .field("recent_limit", &self.recent_limit)
            .finish_non_exhaustive()
    }
}

/// Build the router with every route and the HTTP trace layer.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/calc", post(handlers::post_size))
        .route("/api/calc/current", post(handlers::post_current))
        .route("/api/calc/voltage-drop", post(handlers::post_voltage_drop))
        .route("/api/motors", get(handlers::get_motors))
        .route("/api/conductors", get(handlers::get_conductors))
        .route(
            "/api/conductor-materials",
            get(handlers::get_conductor_materials),
        )
        .route("/api/history", get(handlers::get_history))
        .route("/api/status", get(handlers::get_status))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Handle to the running API server.
#[derive(Debug)]
pub struct ApiServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl ApiServer {
    /// Bound address; differs from the requested one when port 0 was used.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(err.into()),
        }
    }
}

/// Spawn the REST API on `addr`.
pub fn spawn_api_server(state: Arc<ApiState>, addr: SocketAddr) -> Result<ApiServer> {
    let app = router(state);

    let listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind API listener {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("failed to configure API listener as non-blocking")?;
    let bound = listener
        .local_addr()
        .context("failed to read API listener address")?;
    let tcp_listener =
        TcpListener::from_std(listener).context("failed to create tokio listener")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        info!(address = %bound, "api server listening");
        if let Err(err) = axum::serve(tcp_listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(address = %bound, error = %err, "api server exited with error");
            return Err(err.into());
        }
        Ok(())
    });

    Ok(ApiServer {
        addr: bound,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}
