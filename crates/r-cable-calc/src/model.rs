//! ---
//! rc_section: "08-conductor-sizing"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Conductor sizing calculations over reference tables."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference temperature (°C) for conductor resistance correction.
pub const REFERENCE_TEMPERATURE_C: f64 = 40.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PhaseType {
    Single,
    Three,
}

impl PhaseType {
    /// Multiplier applied to the per-conductor drop (2 for the out-and-back
    /// single-phase loop, 1.73 line-to-line for three-phase).
    pub fn drop_factor(&self) -> f64 {
        match self {
            PhaseType::Single => 2.0,
            PhaseType::Three => 1.73,
        }
    }

    /// Divisor applied to `V·pf` when deriving line current from power.
    pub fn current_divisor(&self) -> f64 {
        match self {
            PhaseType::Single => 1.0,
            PhaseType::Three => 3f64.sqrt(),
        }
    }
}

impl fmt::Display for PhaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseType::Single => f.write_str("single"),
            PhaseType::Three => f.write_str("three"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MotorType {
    Induction,
    Synchronous,
    Other,
}

impl fmt::Display for MotorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorType::Induction => f.write_str("induction"),
            MotorType::Synchronous => f.write_str("synchronous"),
            MotorType::Other => f.write_str("other"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Motor {
    pub id: u32,
    pub motor_type: MotorType,
    pub description: String,
    pub power_hp: f64,
    pub voltage: f64,
    pub phases: PhaseType,
    pub power_factor: f64,
    /// Rated full-load current, used as the nominal current of the load.
    pub rated_current_a: f64,
    pub starting_current_a: f64,
}

impl Motor {
    pub fn matches(&self, motor_type: MotorType, voltage: f64, power_hp: f64) -> bool {
        self.motor_type == motor_type
            && (self.voltage - voltage).abs() < 1e-6
            && (self.power_hp - power_hp).abs() < 1e-6
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CableMaterial {
    Copper,
    Aluminum,
}

impl CableMaterial {
    /// Tie-break order when two conductors share an ampacity rating.
    pub fn preference(&self) -> u8 {
        match self {
            CableMaterial::Copper => 0,
            CableMaterial::Aluminum => 1,
        }
    }
}

impl fmt::Display for CableMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CableMaterial::Copper => f.write_str("copper"),
            CableMaterial::Aluminum => f.write_str("aluminum"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conductor {
    pub id: u32,
    pub gauge: String,
    pub material: CableMaterial,
    pub insulation: String,
    pub ampacity_a: f64,
    pub cross_section_mm2: f64,
    pub resistance_per_km_ohm: f64,
    #[serde(default)]
    pub reactance_per_km_ohm: Option<f64>,
    pub max_voltage_v: f64,
}

impl Conductor {
    /// Resistance corrected from the 20 °C table value to the operating temperature.
    pub fn resistance_at(&self, temperature_c: f64) -> f64 {
        self.resistance_per_km_ohm * ((234.5 + temperature_c) / 254.5)
    }

    pub fn reactance(&self) -> f64 {
        self.reactance_per_km_ohm.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GroupingFactor {
    pub conductor_count: u32,
    pub factor: f64,
}
