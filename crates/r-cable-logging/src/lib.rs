//! ---
//! rc_section: "03-persistence-logging"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Structured logging context and macros."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Request-scoped logging helpers layered on `tracing`.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

/// `rc_*!` logging macros.
pub mod macros;

/// Initialize a baseline tracing subscriber suitable for command-line tools.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Identifier of the HTTP request or CLI invocation.
    pub request_id: Option<&'a str>,
    /// Calculation or query being served (e.g. `current`, `voltage_drop`).
    pub operation: Option<&'a str>,
    /// `motor` or `general` for calculation requests.
    pub load_kind: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a request identifier.
    pub fn with_request_id(mut self, request_id: &'a str) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Attach the operation name.
    pub fn with_operation(mut self, operation: &'a str) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Attach the load kind.
    pub fn with_load_kind(mut self, load_kind: &'a str) -> Self {
        self.load_kind = Some(load_kind);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation failed or was aborted.
    Fault,
}

impl SystemEventOutcome {
    /// Label recorded in the `outcome` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized system event with a success/fault outcome.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    match outcome {
        SystemEventOutcome::Success => crate::__rc_event!(
            Level::INFO,
            ctx,
            "{} outcome={} {}",
            event,
            outcome.as_str(),
            message
        ),
        SystemEventOutcome::Fault => crate::__rc_event!(
            Level::ERROR,
            ctx,
            "{} outcome={} {}",
            event,
            outcome.as_str(),
            message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new()
            .with_request_id("2f1c")
            .with_operation("current")
            .with_load_kind("motor");
        rc_info!(context = ctx.clone(), "calculation accepted");
        rc_debug!("debug message");
        rc_warn!(context = ctx.clone(), "history unavailable");
        rc_error!(context = ctx, "error code: {}", 42);
    }

    #[test]
    fn builder_sets_fields() {
        let ctx = LogContext::new().with_operation("history");
        assert_eq!(ctx.operation, Some("history"));
        assert!(ctx.request_id.is_none());
        assert!(ctx.load_kind.is_none());
    }

    #[test]
    fn system_event_helper_emits() {
        init();
        let ctx = LogContext::new().with_request_id("cli");
        log_system_event(
            Some(&ctx),
            "reference.load",
            "reference tables ready",
            SystemEventOutcome::Success,
        );
        log_system_event(
            None,
            "history.open",
            "history file unreadable",
            SystemEventOutcome::Fault,
        );
        assert_eq!(SystemEventOutcome::Fault.as_str(), "fault");
    }
}
