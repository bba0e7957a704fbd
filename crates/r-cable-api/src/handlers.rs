//! ---
//! rc_section: "05-networking-external-interfaces"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "REST surface for conductor sizing."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use r_cable_calc::{
    api::{CalculationRequest, CurrentResult, SizingResult, VoltageDropRequest, VoltageDropResult},
    model::{CableMaterial, Conductor},
    reference::{MotorPage, MotorQuery},
    Calculator, ErrorKind,
};
use r_cable_common::MAX_RECENT_LIMIT;
use r_cable_history::{join_conductors, CalculationRecord, HistoryRecorder, HistoryView};
use r_cable_logging::{rc_debug, rc_error, rc_info, LogContext};
use r_cable_metrics::CalcOutcome;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, ApiState};

fn load_kind(is_motor: bool) -> &'static str {
    if is_motor {
        "motor"
    } else {
        "general"
    }
}

fn outcome_of<T>(outcome: &r_cable_calc::Result<T>) -> CalcOutcome {
    match outcome {
        Ok(_) => CalcOutcome::Ok,
        Err(err) => match err.kind() {
            ErrorKind::Validation => CalcOutcome::Validation,
            ErrorKind::NotFound => CalcOutcome::NotFound,
            ErrorKind::ConstraintUnsatisfiable => CalcOutcome::Unsatisfiable,
            ErrorKind::Internal => CalcOutcome::Internal,
        },
    }
}

/// Run a history operation on the blocking pool; the file-backed recorder
/// writes, flushes and reads the whole log under its lock.
async fn with_history<R, F>(state: &ApiState, ctx: &LogContext<'_>, op: F) -> Result<R, ApiError>
where
    F: FnOnce(&dyn HistoryRecorder) -> r_cable_history::Result<R> + Send + 'static,
    R: Send + 'static,
{
    let history = Arc::clone(&state.history);
    match tokio::task::spawn_blocking(move || op(history.as_ref())).await {
        Ok(outcome) => outcome.map_err(|err| ApiError::from_history(err, ctx)),
        Err(err) => {
            rc_error!(context = ctx, "history task failed: {}", err);
            Err(ApiError::internal())
        }
    }
}

/// Run one calculation under a fresh request id, record metrics and append
/// the successful result to history.
async fn run_calculation<T>(
    state: &ApiState,
    operation: &'static str,
    load_kind: &'static str,
    compute: impl FnOnce(&Calculator) -> r_cable_calc::Result<T>,
) -> Result<T, ApiError>
where
    for<'a> CalculationRecord: From<&'a T>,
{
    let request_id = Uuid::new_v4().to_string();
    let ctx = LogContext::new()
        .with_request_id(&request_id)
        .with_operation(operation)
        .with_load_kind(load_kind);

    let started = Instant::now();
    let outcome = compute(&state.calculator);
    if let Some(metrics) = &state.metrics {
        metrics.record(
            operation,
            outcome_of(&outcome),
            started.elapsed().as_secs_f64(),
        );
    }
    let result = outcome.map_err(|err| ApiError::from_calc(err, &ctx))?;

    let record = CalculationRecord::from(&result);
    let entry = with_history(state, &ctx, move |history| history.append(record)).await?;
    rc_info!(context = ctx, "calculation recorded as history entry {}", entry.id);
    Ok(result)
}

pub(crate) async fn post_current(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Result<Json<CurrentResult>, ApiError> {
    let Json(request) = payload?;
    run_calculation(&state, "current", load_kind(request.is_motor), |calc| {
        calc.compute_current(&request)
    })
    .await
    .map(Json)
}

pub(crate) async fn post_voltage_drop(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<VoltageDropRequest>, JsonRejection>,
) -> Result<Json<VoltageDropResult>, ApiError> {
    let Json(request) = payload?;
    let is_motor = request.prior.as_ref().is_some_and(|prior| prior.is_motor);
    run_calculation(&state, "voltage_drop", load_kind(is_motor), |calc| {
        calc.compute_voltage_drop(&request)
    })
    .await
    .map(Json)
}

pub(crate) async fn post_size(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Result<Json<SizingResult>, ApiError> {
    let Json(request) = payload?;
    run_calculation(&state, "size", load_kind(request.is_motor), |calc| {
        calc.size_conductor(&request)
    })
    .await
    .map(Json)
}

pub(crate) async fn get_motors(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<MotorQuery>, QueryRejection>,
) -> Result<Json<MotorPage>, ApiError> {
    let Query(query) = query?;
    let page = state.calculator.reference().list_motors(&query);
    rc_debug!(
        context = LogContext::new().with_operation("motors"),
        "listed {} of {} motors",
        page.items.len(),
        page.total
    );
    Ok(Json(page))
}

pub(crate) async fn get_conductors(State(state): State<Arc<ApiState>>) -> Json<Vec<Conductor>> {
    Json(state.calculator.reference().conductors().to_vec())
}

pub(crate) async fn get_conductor_materials(
    State(state): State<Arc<ApiState>>,
) -> Json<Vec<CableMaterial>> {
    Json(state.calculator.reference().materials())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

pub(crate) async fn get_history(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<HistoryView>>, ApiError> {
    let Query(query) = query?;
    let limit = match query.limit {
        Some(0) => return Err(ApiError::validation("limit must be at least 1")),
        Some(limit) => limit.min(MAX_RECENT_LIMIT),
        None => state.recent_limit,
    };
    let ctx = LogContext::new().with_operation("history");
    let entries = with_history(&state, &ctx, move |history| history.recent(limit)).await?;
    Ok(Json(join_conductors(entries, state.calculator.reference())))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub name: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub motors: usize,
    pub conductors: usize,
    pub grouping_factors: usize,
    pub temperature_derating: f64,
}

pub(crate) async fn get_status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let reference = state.calculator.reference();
    Json(StatusResponse {
        name: state.version.name.to_string(),
        version: state.version.version.to_string(),
        uptime_seconds: state.start.elapsed().as_secs(),
        motors: reference.motors().len(),
        conductors: reference.conductors().len(),
        grouping_factors: reference.grouping_factors().len(),
        temperature_derating: state.calculator.settings().temperature_derating,
    })
}
