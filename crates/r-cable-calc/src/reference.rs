//! ---
//! rc_section: "08-conductor-sizing"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Conductor sizing calculations over reference tables."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
//! Read-only reference tables: motors, conductors and grouping factors.
//!
//! A [`ReferenceData`] is validated and ordered once when it is built and is
//! then shared behind an `Arc` by every calculation.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    errors::{CalcEngineError, Result},
    model::{CableMaterial, Conductor, GroupingFactor, Motor, MotorType, PhaseType},
};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// Serializable form of the reference tables, used for data files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceTables {
    #[serde(default)]
    pub motors: Vec<Motor>,
    #[serde(default)]
    pub conductors: Vec<Conductor>,
    #[serde(default)]
    pub grouping_factors: Vec<GroupingFactor>,
}

#[derive(Debug, Clone)]
pub struct ReferenceData {
    motors: Vec<Motor>,
    conductors: Vec<Conductor>,
    grouping: Vec<GroupingFactor>,
}

impl ReferenceData {
    /// Validate the tables and order conductors by ampacity, copper first on ties.
    pub fn new(tables: ReferenceTables) -> Result<Self> {
        let ReferenceTables {
            motors,
            mut conductors,
            grouping_factors: mut grouping,
        } = tables;

        if conductors.is_empty() {
            return Err(CalcEngineError::InvalidReferenceData(
                "conductor table is empty".into(),
            ));
        }
        for conductor in &conductors {
            if !(conductor.ampacity_a.is_finite() && conductor.ampacity_a > 0.0) {
                return Err(CalcEngineError::InvalidReferenceData(format!(
                    "conductor {} ({}) has non-positive ampacity {}",
                    conductor.id, conductor.gauge, conductor.ampacity_a
                )));
            }
            let impedance_valid = [conductor.resistance_per_km_ohm, conductor.reactance()]
                .iter()
                .all(|value| value.is_finite() && *value >= 0.0);
            if !impedance_valid {
                return Err(CalcEngineError::InvalidReferenceData(format!(
                    "conductor {} ({}) has negative or non-finite impedance",
                    conductor.id, conductor.gauge
                )));
            }
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = conductors.iter().find(|c| !seen.insert(c.id)) {
            return Err(CalcEngineError::InvalidReferenceData(format!(
                "duplicate conductor id {}",
                duplicate.id
            )));
        }
        conductors.sort_by(compare_conductors);

        grouping.sort_by_key(|entry| entry.conductor_count);
        for entry in &grouping {
            if entry.conductor_count == 0 || !(entry.factor > 0.0 && entry.factor <= 1.0) {
                return Err(CalcEngineError::InvalidReferenceData(format!(
                    "grouping factor {} for {} conductors is outside (0, 1]",
                    entry.factor, entry.conductor_count
                )));
            }
        }
        for pair in grouping.windows(2) {
            if pair[0].conductor_count == pair[1].conductor_count {
                return Err(CalcEngineError::InvalidReferenceData(format!(
                    "grouping factor for {} conductors defined twice",
                    pair[0].conductor_count
                )));
            }
            if pair[1].factor > pair[0].factor {
                return Err(CalcEngineError::InvalidReferenceData(format!(
                    "grouping factor rises from {} to {} between {} and {} conductors",
                    pair[0].factor, pair[1].factor, pair[0].conductor_count, pair[1].conductor_count
                )));
            }
        }

        for motor in &motors {
            let currents_valid = motor.rated_current_a.is_finite()
                && motor.rated_current_a > 0.0
                && motor.starting_current_a.is_finite()
                && motor.starting_current_a >= 0.0;
            if !currents_valid {
                return Err(CalcEngineError::InvalidReferenceData(format!(
                    "motor {} has invalid current ratings",
                    motor.id
                )));
            }
            if !(motor.power_factor > 0.0 && motor.power_factor <= 1.0) {
                return Err(CalcEngineError::InvalidReferenceData(format!(
                    "motor {} power factor {} is outside (0, 1]",
                    motor.id, motor.power_factor
                )));
            }
        }

        Ok(Self {
            motors,
            conductors,
            grouping,
        })
    }

    /// Built-in tables used when no data file is configured.
    pub fn seeded() -> Self {
        Self::new(seed_tables()).expect("seed tables satisfy reference invariants")
    }

    pub fn motors(&self) -> &[Motor] {
        &self.motors
    }

    /// Conductors in ascending ampacity order.
    pub fn conductors(&self) -> &[Conductor] {
        &self.conductors
    }

    pub fn grouping_factors(&self) -> &[GroupingFactor] {
        &self.grouping
    }

    pub fn conductor(&self, id: u32) -> Option<&Conductor> {
        self.conductors.iter().find(|c| c.id == id)
    }

    pub fn find_motor(&self, motor_type: MotorType, voltage: f64, power_hp: f64) -> Option<&Motor> {
        self.motors
            .iter()
            .find(|motor| motor.matches(motor_type, voltage, power_hp))
    }

    /// Derating factor for `count` bundled conductors. A single conductor is
    /// never derated, even when the table omits the entry.
    pub fn grouping_factor(&self, count: u32) -> Result<f64> {
        if count == 0 {
            return Err(CalcEngineError::validation(
                "parallel conductor count must be at least 1",
            ));
        }
        match self.grouping.iter().find(|entry| entry.conductor_count == count) {
            Some(entry) => Ok(entry.factor),
            None if count == 1 => Ok(1.0),
            None => Err(CalcEngineError::GroupingFactorNotFound(count)),
        }
    }

    /// Distinct conductor materials in table order.
    pub fn materials(&self) -> Vec<CableMaterial> {
        let mut materials = Vec::new();
        for conductor in &self.conductors {
            if !materials.contains(&conductor.material) {
                materials.push(conductor.material);
            }
        }
        materials
    }

    pub fn list_motors(&self, query: &MotorQuery) -> MotorPage {
        let page_size = query
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page = query.page.unwrap_or(1).max(1);
        let needle = query
            .filter
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase);

        let matching: Vec<&Motor> = self
            .motors
            .iter()
            .filter(|motor| match &needle {
                Some(needle) => motor_search_text(motor).contains(needle.as_str()),
                None => true,
            })
            .collect();

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect();

        MotorPage {
            items,
            total,
            page,
            page_size,
        }
    }

    pub fn to_tables(&self) -> ReferenceTables {
        ReferenceTables {
            motors: self.motors.clone(),
            conductors: self.conductors.clone(),
            grouping_factors: self.grouping.clone(),
        }
    }
}

fn compare_conductors(a: &Conductor, b: &Conductor) -> Ordering {
    a.ampacity_a
        .total_cmp(&b.ampacity_a)
        .then_with(|| a.material.preference().cmp(&b.material.preference()))
        .then_with(|| a.id.cmp(&b.id))
}

fn motor_search_text(motor: &Motor) -> String {
    format!(
        "{} {} {}v {}hp",
        motor.motor_type, motor.description, motor.voltage, motor.power_hp
    )
    .to_lowercase()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotorQuery {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorPage {
    pub items: Vec<Motor>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Seed tables. Starting currents are six times the rated current; resistance
/// and reactance follow NEC Chapter 9 Table 9 (PVC conduit, 20 °C).
pub fn seed_tables() -> ReferenceTables {
    let motors = vec![
        motor(
            1,
            MotorType::Induction,
            "Three-phase induction motor 10 HP",
            10.0,
            220.0,
            PhaseType::Three,
            0.85,
            15.2,
        ),
        motor(
            2,
            MotorType::Synchronous,
            "Single-phase synchronous motor 5 HP",
            5.0,
            127.0,
            PhaseType::Single,
            0.90,
            10.5,
        ),
        motor(
            3,
            MotorType::Induction,
            "Industrial induction motor 15 HP",
            15.0,
            440.0,
            PhaseType::Three,
            0.86,
            18.4,
        ),
    ];

    use CableMaterial::{Aluminum, Copper};
    let conductors = vec![
        conductor(1, "14 AWG", 15.0, Copper, "THW", 2.08, 10.2, 0.190),
        conductor(2, "12 AWG", 20.0, Copper, "THHN", 3.31, 6.6, 0.177),
        conductor(3, "10 AWG", 30.0, Copper, "THHN", 5.26, 3.9, 0.164),
        conductor(4, "8 AWG", 50.0, Aluminum, "XHHW", 8.37, 4.3, 0.171),
        conductor(5, "6 AWG", 65.0, Copper, "THW", 13.3, 1.6, 0.167),
        conductor(6, "4 AWG", 85.0, Copper, "THHN", 21.2, 1.02, 0.157),
        conductor(7, "2 AWG", 115.0, Aluminum, "XHHW", 33.6, 1.05, 0.148),
        conductor(8, "1/0 AWG", 150.0, Copper, "THW", 53.5, 0.39, 0.144),
        conductor(9, "2/0 AWG", 175.0, Copper, "THHN", 67.4, 0.33, 0.141),
        conductor(10, "4/0 AWG", 230.0, Copper, "THW", 107.2, 0.20, 0.135),
    ];

    let grouping_factors = [
        (1, 1.00),
        (2, 0.80),
        (3, 0.70),
        (4, 0.65),
        (5, 0.60),
        (6, 0.57),
        (7, 0.54),
        (8, 0.52),
        (9, 0.50),
    ]
    .into_iter()
    .map(|(conductor_count, factor)| GroupingFactor {
        conductor_count,
        factor,
    })
    .collect();

    ReferenceTables {
        motors,
        conductors,
        grouping_factors,
    }
}

#[allow(clippy::too_many_arguments)]
fn motor(
    id: u32,
    motor_type: MotorType,
    description: &str,
    power_hp: f64,
    voltage: f64,
    phases: PhaseType,
    power_factor: f64,
    rated_current_a: f64,
) -> Motor {
    Motor {
        id,
        motor_type,
        description: description.to_owned(),
        power_hp,
        voltage,
        phases,
        power_factor,
        rated_current_a,
        starting_current_a: rated_current_a * 6.0,
    }
}

#[allow(clippy::too_many_arguments)]
fn conductor(
    id: u32,
    gauge: &str,
    ampacity_a: f64,
    material: CableMaterial,
    insulation: &str,
    cross_section_mm2: f64,
    resistance_per_km_ohm: f64,
    reactance_per_km_ohm: f64,
) -> Conductor {
    Conductor {
        id,
        gauge: gauge.to_owned(),
        material,
        insulation: insulation.to_owned(),
        ampacity_a,
        cross_section_mm2,
        resistance_per_km_ohm,
        reactance_per_km_ohm: Some(reactance_per_km_ohm),
        max_voltage_v: 600.0,
    }
}
