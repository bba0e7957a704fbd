//! ---
//! rc_section: "08-conductor-sizing"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Conductor sizing calculations over reference tables."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
//! Request and response payloads shared by the REST API and the CLI.

use serde::{Deserialize, Serialize};

use crate::{
    model::{Conductor, MotorType, PhaseType},
    voltage_drop::DropEvaluation,
};

/// Load parameters as submitted by a caller. Mandatory fields are optional
/// here so that omissions surface as validation errors rather than decode errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    #[serde(default)]
    pub voltage: Option<f64>,
    /// Kilowatts for general loads, horsepower for motors.
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub power_factor: Option<f64>,
    #[serde(default)]
    pub phases: Option<PhaseType>,
    #[serde(default)]
    pub is_motor: bool,
    #[serde(default)]
    pub motor_type: Option<MotorType>,
    #[serde(default)]
    pub parallel_conductors: Option<u32>,
    #[serde(default)]
    pub length_m: Option<f64>,
    #[serde(default)]
    pub max_drop_percent: Option<f64>,
    #[serde(default)]
    pub phase_angle_deg: Option<f64>,
}

impl CalculationRequest {
    pub fn wants_voltage_drop(&self) -> bool {
        self.length_m.is_some() && self.max_drop_percent.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentResult {
    pub voltage: f64,
    pub phases: PhaseType,
    pub power: f64,
    pub power_factor: f64,
    pub is_motor: bool,
    #[serde(default)]
    pub motor_type: Option<MotorType>,
    pub parallel_conductors: u32,
    pub nominal_current_a: f64,
    pub adjusted_current_a: f64,
    pub grouping_factor: f64,
    pub temperature_factor: f64,
    pub corrected_current_a: f64,
    #[serde(default)]
    pub starting_current_a: Option<f64>,
    pub required_ampacity_a: f64,
    pub suggested_conductor: Conductor,
    #[serde(default)]
    pub candidates: Vec<Conductor>,
}

impl CurrentResult {
    /// Design current carried by each parallel conductor.
    pub fn current_per_conductor(&self) -> f64 {
        self.adjusted_current_a / f64::from(self.parallel_conductors.max(1))
    }
}

/// Second-pass input: run geometry plus the result of a prior current calculation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoltageDropRequest {
    /// Defaults to the voltage of the prior result.
    #[serde(default)]
    pub voltage: Option<f64>,
    #[serde(default)]
    pub length_m: Option<f64>,
    #[serde(default)]
    pub max_drop_percent: Option<f64>,
    /// Defaults to `acos(power_factor)` of the prior result.
    #[serde(default)]
    pub phase_angle_deg: Option<f64>,
    #[serde(default)]
    pub prior: Option<CurrentResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoltageDropResult {
    #[serde(flatten)]
    pub current: CurrentResult,
    pub voltage_drop: DropEvaluation,
}

impl VoltageDropResult {
    pub fn selected_conductor(&self) -> &Conductor {
        &self.voltage_drop.conductor
    }
}

/// Outcome of the full pipeline: ampacity selection and, when the run is
/// described, the voltage-drop pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingResult {
    #[serde(flatten)]
    pub current: CurrentResult,
    #[serde(default)]
    pub voltage_drop: Option<DropEvaluation>,
    pub selected_conductor: Conductor,
}

impl From<CurrentResult> for SizingResult {
    fn from(current: CurrentResult) -> Self {
        let selected_conductor = current.suggested_conductor.clone();
        Self {
            current,
            voltage_drop: None,
            selected_conductor,
        }
    }
}

impl From<VoltageDropResult> for SizingResult {
    fn from(result: VoltageDropResult) -> Self {
        let selected_conductor = result.voltage_drop.conductor.clone();
        Self {
            current: result.current,
            voltage_drop: Some(result.voltage_drop),
            selected_conductor,
        }
    }
}
