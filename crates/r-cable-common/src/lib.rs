//! ---
//! rc_section: "01-core-functionality"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Shared configuration, tracing and version utilities."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
//! Shared primitives for the R-CABLE workspace: configuration loading,
//! tracing initialisation and version metadata.

pub mod config;
pub mod logging;
pub mod version;

pub use config::{
    ApiConfig, AppConfig, CalcConfig, HistoryConfig, LoadedAppConfig, LoggingConfig,
    MetricsConfig, ReferenceConfig, MAX_RECENT_LIMIT,
};
pub use logging::{init_tracing, LogFormat};
pub use version::{version, VersionInfo};
