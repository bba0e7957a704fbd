//! ---
//! rc_section: "01-core-functionality"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Shared configuration, tracing and version utilities."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

/// Upper bound for any history listing.
pub const MAX_RECENT_LIMIT: usize = 100;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_listen() -> SocketAddr {
    "0.0.0.0:9898"
        .parse()
        .expect("valid default metrics address")
}

fn default_api_enabled() -> bool {
    true
}

fn default_api_listen() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid default api address")
}

fn default_history_enabled() -> bool {
    true
}

fn default_history_path() -> PathBuf {
    PathBuf::from("target/history/calculations.jsonl")
}

fn default_recent_limit() -> usize {
    10
}

fn default_temperature_derating() -> f64 {
    1.0
}

fn default_max_candidates() -> usize {
    3
}

/// Primary configuration object for the R-CABLE service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub calc: CalcConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when built-in defaults were used.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "R_CABLE_CONFIG";

    /// Load configuration from disk, respecting the `R_CABLE_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Some(loaded) = Self::try_load(candidates)? {
            return Ok(loaded);
        }
        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Like [`AppConfig::load_with_source`], but falls back to defaults when
    /// neither the override nor any candidate exists.
    pub fn load_or_default<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        Ok(Self::try_load(candidates)?.unwrap_or_else(|| LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        }))
    }

    fn try_load<P: AsRef<Path>>(candidates: &[P]) -> Result<Option<LoadedAppConfig>> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(Some(LoadedAppConfig {
                    config,
                    source: Some(path),
                }));
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(Some(LoadedAppConfig {
                    config,
                    source: Some(path),
                }));
            }
        }
        Ok(None)
    }

    /// Read and validate a single TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.reference.validate()?;
        self.history.validate()?;
        self.calc.validate()?;
        // Port 0 asks the OS for a fresh port per listener.
        if self.api.enabled
            && self.metrics.enabled
            && self.api.listen == self.metrics.listen
            && self.api.listen.port() != 0
        {
            return Err(anyhow!(
                "api and metrics cannot share listen address {}",
                self.api.listen
            ));
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            listen: default_metrics_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_api_enabled(),
            listen: default_api_listen(),
        }
    }
}

/// Where the motor, conductor and grouping tables come from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// TOML, JSON or YAML table file. Built-in tables are used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl ReferenceConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.path {
            if !path.is_file() {
                return Err(anyhow!(
                    "reference path {} does not exist or is not a file",
                    path.display()
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// When disabled, history is kept in memory only.
    #[serde(default = "default_history_enabled")]
    pub enabled: bool,
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_history_enabled(),
            path: default_history_path(),
            recent_limit: default_recent_limit(),
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.recent_limit == 0 || self.recent_limit > MAX_RECENT_LIMIT {
            return Err(anyhow!(
                "history recent_limit must be within 1..={}, got {}",
                MAX_RECENT_LIMIT,
                self.recent_limit
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalcConfig {
    /// Ambient temperature correction; 0.88 corresponds to 40 °C.
    #[serde(default = "default_temperature_derating")]
    pub temperature_derating: f64,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            temperature_derating: default_temperature_derating(),
            max_candidates: default_max_candidates(),
        }
    }
}

impl CalcConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.temperature_derating > 0.0 && self.temperature_derating <= 1.0) {
            return Err(anyhow!(
                "calc temperature_derating must be within (0, 1], got {}",
                self.temperature_derating
            ));
        }
        if self.max_candidates == 0 {
            return Err(anyhow!("calc max_candidates must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
        assert_eq!(config.api.listen.port(), 8080);
        assert_eq!(config.metrics.listen.port(), 9898);
        assert_eq!(config.history.recent_limit, 10);
        assert_eq!(config.calc.temperature_derating, 1.0);
        assert_eq!(config.calc.max_candidates, 3);
        assert!(config.reference.path.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config: AppConfig = r#"
            [logging]
            format = "pretty"
            file_prefix = "cable"

            [api]
            listen = "127.0.0.1:7000"

            [history]
            enabled = false
            recent_limit = 25

            [calc]
            temperature_derating = 0.88
            max_candidates = 5
        "#
        .parse()
        .unwrap();
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.file_prefix.as_deref(), Some("cable"));
        assert_eq!(config.api.listen.port(), 7000);
        assert!(!config.history.enabled);
        assert_eq!(config.history.recent_limit, 25);
        assert_eq!(config.calc.temperature_derating, 0.88);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for doc in [
            "[calc]\ntemperature_derating = 0.0",
            "[calc]\ntemperature_derating = 1.2",
            "[calc]\nmax_candidates = 0",
            "[history]\nrecent_limit = 0",
            "[history]\nrecent_limit = 101",
            "[reference]\npath = \"/definitely/not/here.toml\"",
            "[api]\nlisten = \"127.0.0.1:9000\"\n[metrics]\nlisten = \"127.0.0.1:9000\"",
        ] {
            assert!(doc.parse::<AppConfig>().is_err(), "{doc}");
        }
    }

    #[test]
    fn shipped_example_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs/r-cable.toml");
        let config = AppConfig::from_path(&path).unwrap();
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.history.enabled);
    }

    #[test]
    fn missing_candidates_fall_back_to_defaults() {
        let loaded = AppConfig::load_or_default(&["/definitely/not/here.toml"]).unwrap();
        assert!(loaded.source.is_none());
        assert!(AppConfig::load_with_source(&["/definitely/not/here.toml"]).is_err());
    }
}
