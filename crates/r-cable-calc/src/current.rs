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
use tracing::debug;

use crate::{
    api::CalculationRequest,
    errors::{CalcEngineError, Result},
    model::{MotorType, PhaseType},
    reference::ReferenceData,
};

/// Continuous-duty margin for motor branch circuits.
pub const MOTOR_SAFETY_FACTOR: f64 = 1.25;
/// Margin applied to general (non-motor) loads.
pub const GENERAL_LOAD_FACTOR: f64 = 1.10;
/// Fraction of the starting current each conductor set must carry.
pub const MOTOR_STARTING_DIVISOR: f64 = 6.0;
/// Ambient derating for 40 °C, offered as the `temperature_derating` setting.
pub const AMBIENT_40C_DERATING: f64 = 0.88;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadProfile {
    Motor {
        motor_type: MotorType,
        power_hp: f64,
        /// Overrides the power factor recorded in the motor table.
        #[serde(default)]
        power_factor: Option<f64>,
    },
    General { power_kw: f64, power_factor: f64 },
}

/// Load parameters after validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSpec {
    pub voltage: f64,
    pub phases: PhaseType,
    pub profile: LoadProfile,
    pub parallel_conductors: u32,
}

impl TryFrom<&CalculationRequest> for LoadSpec {
    type Error = CalcEngineError;

    fn try_from(request: &CalculationRequest) -> Result<Self> {
        let voltage = positive(request.voltage, "voltage")?;
        let power = positive(request.power, "power")?;
        let phases = request
            .phases
            .ok_or_else(|| CalcEngineError::validation("phases is required"))?;
        let parallel_conductors = request.parallel_conductors.unwrap_or(1);
        if parallel_conductors == 0 {
            return Err(CalcEngineError::validation(
                "parallel_conductors must be at least 1",
            ));
        }

        if let Some(power_factor) = request.power_factor {
            if !(power_factor > 0.0 && power_factor <= 1.0) {
                return Err(CalcEngineError::validation(format!(
                    "power_factor must be within (0, 1], got {power_factor}"
                )));
            }
        }

        let profile = if request.is_motor {
            let motor_type = request.motor_type.ok_or_else(|| {
                CalcEngineError::validation("motor_type is required for motor loads")
            })?;
            LoadProfile::Motor {
                motor_type,
                power_hp: power,
                power_factor: request.power_factor,
            }
        } else {
            let power_factor = request
                .power_factor
                .ok_or_else(|| CalcEngineError::validation("power_factor is required"))?;
            LoadProfile::General {
                power_kw: power,
                power_factor,
            }
        };

        Ok(Self {
            voltage,
            phases,
            profile,
            parallel_conductors,
        })
    }
}

fn positive(value: Option<f64>, field: &str) -> Result<f64> {
    match value {
        None => Err(CalcEngineError::validation(format!("{field} is required"))),
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        Some(v) => Err(CalcEngineError::validation(format!(
            "{field} must be positive, got {v}"
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentComputation {
    pub nominal_current_a: f64,
    pub adjusted_current_a: f64,
    pub grouping_factor: f64,
    pub temperature_factor: f64,
    pub corrected_current_a: f64,
    pub starting_current_a: Option<f64>,
    /// Ampacity each parallel conductor must provide.
    pub required_ampacity_a: f64,
    /// Load power factor; motors fall back to the motor table value.
    pub power_factor: f64,
}

pub fn compute_current(
    reference: &ReferenceData,
    load: &LoadSpec,
    temperature_factor: f64,
) -> Result<CurrentComputation> {
    let (nominal, adjusted, starting, power_factor) = match load.profile {
        LoadProfile::Motor {
            motor_type,
            power_hp,
            power_factor,
        } => {
            let motor = reference
                .find_motor(motor_type, load.voltage, power_hp)
                .ok_or(CalcEngineError::MotorNotFound {
                    motor_type,
                    voltage: load.voltage,
                    power_hp,
                })?;
            debug!(motor_id = motor.id, rated_current = motor.rated_current_a, "motor matched");
            let nominal = motor.rated_current_a;
            (
                nominal,
                nominal * MOTOR_SAFETY_FACTOR,
                Some(motor.starting_current_a),
                power_factor.unwrap_or(motor.power_factor),
            )
        }
        LoadProfile::General {
            power_kw,
            power_factor,
        } => {
            let nominal = general_load_current(power_kw, load.voltage, power_factor, load.phases);
            (nominal, nominal * GENERAL_LOAD_FACTOR, None, power_factor)
        }
    };

    let grouping_factor = reference.grouping_factor(load.parallel_conductors)?;
    let corrected = adjusted * grouping_factor * temperature_factor;
    let inrush_share = starting.map_or(0.0, |s| s / MOTOR_STARTING_DIVISOR);
    let required = corrected.max(inrush_share) / f64::from(load.parallel_conductors);

    Ok(CurrentComputation {
        nominal_current_a: nominal,
        adjusted_current_a: adjusted,
        grouping_factor,
        temperature_factor,
        corrected_current_a: corrected,
        starting_current_a: starting,
        required_ampacity_a: required,
        power_factor,
    })
}

/// Line current of a general load with `power_kw` given in kilowatts.
pub fn general_load_current(power_kw: f64, voltage: f64, power_factor: f64, phases: PhaseType) -> f64 {
    (power_kw * 1000.0) / (phases.current_divisor() * voltage * power_factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn general(voltage: f64, power_kw: f64, pf: f64, phases: PhaseType) -> LoadSpec {
        LoadSpec {
            voltage,
            phases,
            profile: LoadProfile::General {
                power_kw,
                power_factor: pf,
            },
            parallel_conductors: 1,
        }
    }

    #[test]
    fn three_phase_general_load() {
        let data = ReferenceData::seeded();
        let result = compute_current(&data, &general(220.0, 10.0, 0.9, PhaseType::Three), 1.0)
            .unwrap();
        assert!((result.nominal_current_a - 29.16).abs() < 0.02);
        assert!((result.adjusted_current_a - 32.08).abs() < 0.02);
        assert_eq!(result.grouping_factor, 1.0);
        assert_eq!(result.starting_current_a, None);
        assert!((result.required_ampacity_a - result.adjusted_current_a).abs() < 1e-9);
    }

    #[test]
    fn single_phase_general_load() {
        let data = ReferenceData::seeded();
        let result =
            compute_current(&data, &general(127.0, 2.0, 0.8, PhaseType::Single), 1.0).unwrap();
        let expected = 2000.0 / (127.0 * 0.8);
        assert!((result.nominal_current_a - expected).abs() < 1e-9);
        assert!((result.adjusted_current_a - expected * 1.1).abs() < 1e-9);
    }

    #[test]
    fn induction_motor_uses_table_currents() {
        let data = ReferenceData::seeded();
        let load = LoadSpec {
            voltage: 220.0,
            phases: PhaseType::Three,
            profile: LoadProfile::Motor {
                motor_type: MotorType::Induction,
                power_hp: 10.0,
                power_factor: None,
            },
            parallel_conductors: 1,
        };
        let result = compute_current(&data, &load, 1.0).unwrap();
        assert_eq!(result.nominal_current_a, 15.2);
        assert!((result.adjusted_current_a - 19.0).abs() < 1e-9);
        assert!((result.starting_current_a.unwrap() - 91.2).abs() < 1e-9);
        assert_eq!(result.power_factor, 0.85);
        // 91.2 / 6 = 15.2 stays below the 19 A corrected current.
        assert!((result.required_ampacity_a - 19.0).abs() < 1e-9);
    }

    #[test]
    fn motor_power_factor_from_request_wins() {
        let data = ReferenceData::seeded();
        let request = CalculationRequest {
            voltage: Some(220.0),
            power: Some(10.0),
            power_factor: Some(0.95),
            phases: Some(PhaseType::Three),
            is_motor: true,
            motor_type: Some(MotorType::Induction),
            ..CalculationRequest::default()
        };
        let load = LoadSpec::try_from(&request).unwrap();
        let result = compute_current(&data, &load, 1.0).unwrap();
        assert_eq!(result.power_factor, 0.95);
        assert_eq!(result.nominal_current_a, 15.2);

        let out_of_range = CalculationRequest {
            power_factor: Some(1.4),
            ..request
        };
        assert!(matches!(
            LoadSpec::try_from(&out_of_range),
            Err(CalcEngineError::Validation(_))
        ));
    }

    #[test]
    fn unknown_motor_is_not_found() {
        let data = ReferenceData::seeded();
        let load = LoadSpec {
            voltage: 380.0,
            phases: PhaseType::Three,
            profile: LoadProfile::Motor {
                motor_type: MotorType::Induction,
                power_hp: 10.0,
                power_factor: None,
            },
            parallel_conductors: 1,
        };
        assert!(matches!(
            compute_current(&data, &load, 1.0),
            Err(CalcEngineError::MotorNotFound { .. })
        ));
    }

    #[test]
    fn grouping_and_temperature_correct_the_current() {
        let data = ReferenceData::seeded();
        let mut load = general(220.0, 10.0, 0.9, PhaseType::Three);
        load.parallel_conductors = 2;
        let result = compute_current(&data, &load, AMBIENT_40C_DERATING).unwrap();
        assert_eq!(result.grouping_factor, 0.8);
        let expected = result.adjusted_current_a * 0.8 * 0.88;
        assert!((result.corrected_current_a - expected).abs() < 1e-9);
        assert!((result.required_ampacity_a - expected / 2.0).abs() < 1e-9);
    }

    #[test]
    fn starting_current_can_dominate() {
        let mut tables = crate::reference::seed_tables();
        tables.motors[0].starting_current_a = 15.2 * 9.0;
        let data = ReferenceData::new(tables).unwrap();
        let load = LoadSpec {
            voltage: 220.0,
            phases: PhaseType::Three,
            profile: LoadProfile::Motor {
                motor_type: MotorType::Induction,
                power_hp: 10.0,
                power_factor: None,
            },
            parallel_conductors: 1,
        };
        let result = compute_current(&data, &load, 1.0).unwrap();
        assert!((result.required_ampacity_a - 15.2 * 9.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn request_validation() {
        let base = CalculationRequest {
            voltage: Some(220.0),
            power: Some(10.0),
            power_factor: Some(0.9),
            phases: Some(PhaseType::Three),
            ..CalculationRequest::default()
        };
        assert!(LoadSpec::try_from(&base).is_ok());

        let missing_voltage = CalculationRequest {
            voltage: None,
            ..base.clone()
        };
        assert!(matches!(
            LoadSpec::try_from(&missing_voltage),
            Err(CalcEngineError::Validation(_))
        ));

        let negative_power = CalculationRequest {
            power: Some(-1.0),
            ..base.clone()
        };
        assert!(LoadSpec::try_from(&negative_power).is_err());

        let missing_phases = CalculationRequest {
            phases: None,
            ..base.clone()
        };
        assert!(LoadSpec::try_from(&missing_phases).is_err());

        let bad_pf = CalculationRequest {
            power_factor: Some(1.4),
            ..base.clone()
        };
        assert!(LoadSpec::try_from(&bad_pf).is_err());

        let zero_parallel = CalculationRequest {
            parallel_conductors: Some(0),
            ..base.clone()
        };
        assert!(LoadSpec::try_from(&zero_parallel).is_err());

        let motor_without_type = CalculationRequest {
            is_motor: true,
            power_factor: None,
            ..base
        };
        assert!(LoadSpec::try_from(&motor_without_type).is_err());
    }
}
