//! ---
//! rc_section: "05-networking-external-interfaces"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "REST surface for conductor sizing."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use r_cable_calc::{CalcEngineError, ErrorKind};
use r_cable_history::HistoryError;
use r_cable_logging::{rc_error, rc_warn, LogContext};
use serde::{Deserialize, Serialize};

/// Message returned for failures whose detail only belongs in the logs.
pub const INTERNAL_MESSAGE: &str = "internal error; see server logs";

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

pub(crate) fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::ConstraintUnsatisfiable => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: status_for(kind),
            body: ErrorResponse {
                kind,
                message: message.into(),
                hint: None,
            },
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal, INTERNAL_MESSAGE)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Map a calculator failure, logging it under the request context.
    pub fn from_calc(err: CalcEngineError, ctx: &LogContext) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::Internal {
            rc_error!(context = ctx, "calculation failed: {}", err);
            return Self::internal();
        }
        rc_warn!(context = ctx, "calculation rejected: {}", err);
        let mut api_error = Self::new(kind, err.to_string());
        api_error.body.hint = err.hint().map(str::to_owned);
        api_error
    }

    /// History failures never leak file system detail to clients.
    pub fn from_history(err: HistoryError, ctx: &LogContext) -> Self {
        rc_error!(context = ctx, "history unavailable: {}", err);
        Self::internal()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(ErrorKind::ConstraintUnsatisfiable),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(ErrorKind::Internal),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn calc_errors_carry_hints() {
        let ctx = LogContext::new();
        let err = ApiError::from_calc(
            CalcEngineError::VoltageDropUnsatisfiable {
                max_percent: 0.5,
                evaluated: 7,
            },
            &ctx,
        );
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.body.message.contains("7 candidates"));
        assert!(err.body.hint.is_some());
    }

    #[test]
    fn internal_detail_is_hidden() {
        let ctx = LogContext::new();
        let io = std::io::Error::new(std::io::ErrorKind::Other, "/srv/secret path");
        let err = ApiError::from_calc(CalcEngineError::Io(io), &ctx);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.message, INTERNAL_MESSAGE);
        assert!(err.body.hint.is_none());
    }
}
