//! ---
//! rc_section: "08-conductor-sizing"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Conductor sizing calculations over reference tables."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
pub mod api;
pub mod current;
pub mod errors;
pub mod io;
pub mod model;
pub mod reference;
pub mod selector;
pub mod voltage_drop;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::{
    api::{CalculationRequest, CurrentResult, SizingResult, VoltageDropRequest, VoltageDropResult},
    current::{compute_current, LoadProfile, LoadSpec},
    reference::ReferenceData,
    selector::{select_conductor, DEFAULT_MAX_CANDIDATES},
    voltage_drop::{evaluate, phase_angle_from_power_factor, DropInputs},
};

pub use errors::{CalcEngineError, ErrorKind, Result};

/// Tunables applied on top of the fixed code factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalcSettings {
    pub temperature_derating: f64,
    pub max_candidates: usize,
}

impl Default for CalcSettings {
    fn default() -> Self {
        Self {
            temperature_derating: 1.0,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

/// Entry point for conductor sizing over a shared, immutable reference set.
#[derive(Debug, Clone)]
pub struct Calculator {
    reference: Arc<ReferenceData>,
    settings: CalcSettings,
}

impl Calculator {
    pub fn new(reference: Arc<ReferenceData>, settings: CalcSettings) -> Result<Self> {
        if !(settings.temperature_derating > 0.0 && settings.temperature_derating <= 1.0) {
            return Err(CalcEngineError::validation(format!(
                "temperature_derating must be within (0, 1], got {}",
                settings.temperature_derating
            )));
        }
        Ok(Self {
            reference,
            settings,
        })
    }

    pub fn reference(&self) -> &Arc<ReferenceData> {
        &self.reference
    }

    pub fn settings(&self) -> &CalcSettings {
        &self.settings
    }

    /// First pass: required ampacity and the smallest conductor that carries it.
    pub fn compute_current(&self, request: &CalculationRequest) -> Result<CurrentResult> {
        let load = LoadSpec::try_from(request)?;
        let span = info_span!(
            "compute_current",
            voltage = load.voltage,
            phases = %load.phases,
            parallel = load.parallel_conductors
        );
        let _guard = span.enter();

        let computation =
            compute_current(&self.reference, &load, self.settings.temperature_derating)?;
        let selection = select_conductor(
            &self.reference,
            computation.required_ampacity_a,
            self.settings.max_candidates,
        )?;

        let (power, motor_type) = match load.profile {
            LoadProfile::Motor {
                motor_type,
                power_hp,
                ..
            } => (power_hp, Some(motor_type)),
            LoadProfile::General { power_kw, .. } => (power_kw, None),
        };

        info!(
            nominal = computation.nominal_current_a,
            required = computation.required_ampacity_a,
            gauge = %selection.suggested.gauge,
            "current calculation complete"
        );

        Ok(CurrentResult {
            voltage: load.voltage,
            phases: load.phases,
            power,
            power_factor: computation.power_factor,
            is_motor: motor_type.is_some(),
            motor_type,
            parallel_conductors: load.parallel_conductors,
            nominal_current_a: computation.nominal_current_a,
            adjusted_current_a: computation.adjusted_current_a,
            grouping_factor: computation.grouping_factor,
            temperature_factor: computation.temperature_factor,
            corrected_current_a: computation.corrected_current_a,
            starting_current_a: computation.starting_current_a,
            required_ampacity_a: computation.required_ampacity_a,
            suggested_conductor: selection.suggested,
            candidates: selection.candidates,
        })
    }

    /// Second pass: filter ampacity-qualified conductors by voltage drop.
    pub fn compute_voltage_drop(&self, request: &VoltageDropRequest) -> Result<VoltageDropResult> {
        let prior = request.prior.clone().ok_or_else(|| {
            CalcEngineError::validation("a prior current calculation is required")
        })?;
        let length_m = request
            .length_m
            .ok_or_else(|| CalcEngineError::validation("length_m is required"))?;
        let max_drop_percent = request
            .max_drop_percent
            .ok_or_else(|| CalcEngineError::validation("max_drop_percent is required"))?;
        let phase_angle_deg = request
            .phase_angle_deg
            .unwrap_or_else(|| phase_angle_from_power_factor(prior.power_factor));

        let inputs = DropInputs {
            voltage: request.voltage.unwrap_or(prior.voltage),
            phases: prior.phases,
            current_a: prior.current_per_conductor(),
            length_m,
            phase_angle_deg,
            max_drop_percent,
        };
        let span = info_span!(
            "compute_voltage_drop",
            length_m,
            max_drop_percent,
            phase_angle_deg
        );
        let _guard = span.enter();

        let evaluation = evaluate(&self.reference, prior.required_ampacity_a, &inputs)?;
        info!(
            gauge = %evaluation.conductor.gauge,
            drop_percent = evaluation.drop_percent,
            evaluated = evaluation.evaluated_candidates,
            "voltage drop calculation complete"
        );
        Ok(VoltageDropResult {
            current: prior,
            voltage_drop: evaluation,
        })
    }

    /// Both passes; the voltage-drop pass runs only when the run length and
    /// the drop limit are given.
    pub fn size_conductor(&self, request: &CalculationRequest) -> Result<SizingResult> {
        let current = self.compute_current(request)?;
        if !request.wants_voltage_drop() {
            return Ok(current.into());
        }
        let drop_request = VoltageDropRequest {
            voltage: None,
            length_m: request.length_m,
            max_drop_percent: request.max_drop_percent,
            phase_angle_deg: request.phase_angle_deg,
            prior: Some(current),
        };
        Ok(self.compute_voltage_drop(&drop_request)?.into())
    }
}
