//! ---
//! rc_section: "08-conductor-sizing"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Conductor sizing calculations over reference tables."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
//! Voltage-drop filtering of ampacity-qualified conductors.
//!
//! ```text
//! R  = R20 × (234.5 + 40) / 254.5
//! AV = k × I × L × (R·cosφ + X·sinφ)        k = 1.73 (three-phase) | 2 (single-phase)
//! %  = AV / V × 100
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    errors::{CalcEngineError, Result},
    model::{Conductor, PhaseType, REFERENCE_TEMPERATURE_C},
    reference::ReferenceData,
    selector::qualifying,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropInputs {
    pub voltage: f64,
    pub phases: PhaseType,
    /// Current carried by each parallel conductor.
    pub current_a: f64,
    pub length_m: f64,
    pub phase_angle_deg: f64,
    pub max_drop_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropMeasurement {
    pub voltage_drop_v: f64,
    pub drop_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropEvaluation {
    pub conductor: Conductor,
    pub voltage_drop_v: f64,
    pub drop_percent: f64,
    pub max_drop_percent: f64,
    pub length_m: f64,
    pub phase_angle_deg: f64,
    pub current_per_conductor_a: f64,
    pub evaluated_candidates: usize,
}

pub fn voltage_drop(conductor: &Conductor, inputs: &DropInputs) -> DropMeasurement {
    let phi = inputs.phase_angle_deg.to_radians();
    let length_km = inputs.length_m / 1000.0;
    let resistance = conductor.resistance_at(REFERENCE_TEMPERATURE_C);
    let reactance = conductor.reactance();

    let voltage_drop_v = inputs.phases.drop_factor()
        * inputs.current_a
        * length_km
        * (resistance * phi.cos() + reactance * phi.sin());
    DropMeasurement {
        voltage_drop_v,
        drop_percent: (voltage_drop_v / inputs.voltage) * 100.0,
    }
}

/// Walk the conductors that carry `required_a`, smallest first, and return
/// the first one whose drop stays within the limit.
pub fn evaluate(
    reference: &ReferenceData,
    required_a: f64,
    inputs: &DropInputs,
) -> Result<DropEvaluation> {
    validate_inputs(inputs)?;

    let mut evaluated = 0usize;
    for conductor in qualifying(reference, required_a) {
        evaluated += 1;
        let measurement = voltage_drop(conductor, inputs);
        debug!(
            gauge = %conductor.gauge,
            voltage_drop = measurement.voltage_drop_v,
            drop_percent = measurement.drop_percent,
            "voltage drop evaluated"
        );
        if measurement.drop_percent <= inputs.max_drop_percent {
            return Ok(DropEvaluation {
                conductor: conductor.clone(),
                voltage_drop_v: measurement.voltage_drop_v,
                drop_percent: measurement.drop_percent,
                max_drop_percent: inputs.max_drop_percent,
                length_m: inputs.length_m,
                phase_angle_deg: inputs.phase_angle_deg,
                current_per_conductor_a: inputs.current_a,
                evaluated_candidates: evaluated,
            });
        }
    }

    warn!(
        evaluated,
        max_drop_percent = inputs.max_drop_percent,
        length_m = inputs.length_m,
        "no conductor satisfies the voltage drop limit"
    );
    if evaluated == 0 {
        return Err(CalcEngineError::NoConductorForAmpacity { required_a });
    }
    Err(CalcEngineError::VoltageDropUnsatisfiable {
        max_percent: inputs.max_drop_percent,
        evaluated,
    })
}

fn validate_inputs(inputs: &DropInputs) -> Result<()> {
    let checks = [
        ("voltage", inputs.voltage),
        ("length_m", inputs.length_m),
        ("max_drop_percent", inputs.max_drop_percent),
    ];
    for (field, value) in checks {
        if !(value.is_finite() && value > 0.0) {
            return Err(CalcEngineError::validation(format!(
                "{field} must be positive, got {value}"
            )));
        }
    }
    if !(inputs.current_a.is_finite() && inputs.current_a >= 0.0) {
        return Err(CalcEngineError::validation("current must be non-negative"));
    }
    if !(0.0..=90.0).contains(&inputs.phase_angle_deg) {
        return Err(CalcEngineError::validation(format!(
            "phase angle must be within 0..=90 degrees, got {}",
            inputs.phase_angle_deg
        )));
    }
    Ok(())
}

/// Phase angle (degrees) whose cosine is the power factor.
pub fn phase_angle_from_power_factor(power_factor: f64) -> f64 {
    power_factor.clamp(0.0, 1.0).acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(max_drop_percent: f64) -> DropInputs {
        DropInputs {
            voltage: 220.0,
            phases: PhaseType::Three,
            current_a: 32.08,
            length_m: 100.0,
            phase_angle_deg: phase_angle_from_power_factor(0.9),
            max_drop_percent,
        }
    }

    #[test]
    fn drop_formula() {
        let data = ReferenceData::seeded();
        let conductor = data.conductors().iter().find(|c| c.gauge == "4 AWG").unwrap();
        let m = voltage_drop(conductor, &inputs(3.0));

        let r = 1.02 * (274.5 / 254.5);
        let sin = (1.0f64 - 0.81).sqrt();
        let expected = 1.73 * 32.08 * 0.1 * (r * 0.9 + 0.157 * sin);
        assert!((m.voltage_drop_v - expected).abs() < 1e-9);
        assert!((m.drop_percent - expected / 220.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn single_phase_uses_factor_two() {
        let data = ReferenceData::seeded();
        let conductor = &data.conductors()[0];
        let three = voltage_drop(conductor, &inputs(3.0));
        let single = voltage_drop(
            conductor,
            &DropInputs {
                phases: PhaseType::Single,
                ..inputs(3.0)
            },
        );
        assert!((single.voltage_drop_v / three.voltage_drop_v - 2.0 / 1.73).abs() < 1e-9);
    }

    #[test]
    fn first_conductor_within_limit_wins() {
        let data = ReferenceData::seeded();
        let evaluation = evaluate(&data, 32.08, &inputs(3.0)).unwrap();
        assert_eq!(evaluation.conductor.gauge, "4 AWG");
        assert_eq!(evaluation.evaluated_candidates, 3);
        assert!(evaluation.drop_percent <= 3.0);
    }

    #[test]
    fn recomputation_is_deterministic() {
        let data = ReferenceData::seeded();
        let a = evaluate(&data, 32.08, &inputs(3.0)).unwrap();
        let b = evaluate(&data, 32.08, &inputs(3.0)).unwrap();
        assert_eq!(a.drop_percent.to_bits(), b.drop_percent.to_bits());
        assert_eq!(a.conductor, b.conductor);
    }

    #[test]
    fn unsatisfiable_reports_evaluated_count() {
        let data = ReferenceData::seeded();
        let err = evaluate(&data, 32.08, &inputs(0.5)).unwrap_err();
        match err {
            CalcEngineError::VoltageDropUnsatisfiable {
                max_percent,
                evaluated,
            } => {
                assert_eq!(max_percent, 0.5);
                assert_eq!(evaluated, 7);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_bad_inputs() {
        let data = ReferenceData::seeded();
        let bad_length = DropInputs {
            length_m: 0.0,
            ..inputs(3.0)
        };
        assert!(matches!(
            evaluate(&data, 10.0, &bad_length),
            Err(CalcEngineError::Validation(_))
        ));
        let bad_angle = DropInputs {
            phase_angle_deg: 120.0,
            ..inputs(3.0)
        };
        assert!(evaluate(&data, 10.0, &bad_angle).is_err());
    }

    #[test]
    fn unity_power_factor_has_zero_angle() {
        assert_eq!(phase_angle_from_power_factor(1.0), 0.0);
        assert!((phase_angle_from_power_factor(0.5) - 60.0).abs() < 1e-9);
    }
}
