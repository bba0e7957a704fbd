//! ---
//! rc_section: "03-persistence-logging"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Structured logging context and macros."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
#[doc(hidden)]
#[macro_export]
macro_rules! __rc_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            request_id = ctx.request_id.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            load_kind = ctx.load_kind.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with request context.
#[macro_export]
macro_rules! rc_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__rc_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__rc_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with request context.
#[macro_export]
macro_rules! rc_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__rc_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__rc_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with request context.
#[macro_export]
macro_rules! rc_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__rc_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__rc_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with request context.
#[macro_export]
macro_rules! rc_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__rc_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__rc_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
