//! ---
//! rc_section: "08-conductor-sizing"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Conductor sizing calculations over reference tables."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::MotorType;

pub type Result<T> = std::result::Result<T, CalcEngineError>;

/// Hint returned with voltage-drop failures.
pub const VOLTAGE_DROP_HINT: &str =
    "increase the allowed voltage drop, add parallel conductors, or shorten the run";

/// Hint returned when no conductor carries the required current.
pub const AMPACITY_HINT: &str =
    "add parallel conductors or split the load; no conductor in the table carries this current";

#[derive(Debug, Error)]
pub enum CalcEngineError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("no {motor_type} motor rated {power_hp} hp at {voltage} V in reference data")]
    MotorNotFound {
        motor_type: MotorType,
        voltage: f64,
        power_hp: f64,
    },
    #[error("no grouping factor defined for {0} conductors")]
    GroupingFactorNotFound(u32),
    #[error("no conductor rated for {required_a:.2} A")]
    NoConductorForAmpacity { required_a: f64 },
    #[error(
        "no conductor keeps the voltage drop within {max_percent:.2}% ({evaluated} candidates evaluated)"
    )]
    VoltageDropUnsatisfiable { max_percent: f64, evaluated: usize },
    #[error("invalid reference data: {0}")]
    InvalidReferenceData(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
    #[error("yaml serialization error: {0}")]
    YamlSerializationFailed(#[from] serde_yaml::Error),
    #[error("toml parse error: {0}")]
    TomlParseFailed(#[from] toml::de::Error),
    #[error("toml serialization error: {0}")]
    TomlSerializationFailed(#[from] toml::ser::Error),
}

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    ConstraintUnsatisfiable,
    Internal,
}

impl CalcEngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        CalcEngineError::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CalcEngineError::Validation(_) => ErrorKind::Validation,
            CalcEngineError::MotorNotFound { .. }
            | CalcEngineError::GroupingFactorNotFound(_)
            | CalcEngineError::NoConductorForAmpacity { .. } => ErrorKind::NotFound,
            CalcEngineError::VoltageDropUnsatisfiable { .. } => ErrorKind::ConstraintUnsatisfiable,
            _ => ErrorKind::Internal,
        }
    }

    /// Remediation text for errors the caller can fix by changing inputs.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CalcEngineError::VoltageDropUnsatisfiable { .. } => Some(VOLTAGE_DROP_HINT),
            CalcEngineError::NoConductorForAmpacity { .. } => Some(AMPACITY_HINT),
            CalcEngineError::GroupingFactorNotFound(_) => {
                Some("use a parallel conductor count listed in the grouping table")
            }
            CalcEngineError::MotorNotFound { .. } => {
                Some("check the motor type, voltage and horsepower against the motor list")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(
            CalcEngineError::validation("voltage is required").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CalcEngineError::GroupingFactorNotFound(12).kind(),
            ErrorKind::NotFound
        );
        let err = CalcEngineError::VoltageDropUnsatisfiable {
            max_percent: 3.0,
            evaluated: 10,
        };
        assert_eq!(err.kind(), ErrorKind::ConstraintUnsatisfiable);
        assert_eq!(err.hint(), Some(VOLTAGE_DROP_HINT));
        assert!(err.to_string().contains("10 candidates"));
        assert_eq!(
            CalcEngineError::InvalidReferenceData("empty".into()).kind(),
            ErrorKind::Internal
        );
    }
}
