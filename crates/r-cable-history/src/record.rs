//! ---
//! rc_section: "03-persistence-logging"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Append-only history of sizing calculations."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use r_cable_calc::{
    api::{CurrentResult, SizingResult, VoltageDropResult},
    model::{CableMaterial, MotorType, PhaseType},
    reference::ReferenceData,
};
use serde::{Deserialize, Serialize};

/// Inputs and outputs of one completed calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRecord {
    /// Nominal system voltage (V).
    pub voltage: f64,
    /// Load power as submitted (kW, or hp for motors).
    pub power: f64,
    /// Load power factor.
    pub power_factor: f64,
    /// Single- or three-phase supply.
    pub phases: PhaseType,
    /// Whether the load was looked up in the motor table.
    pub is_motor: bool,
    /// Motor subtype for motor loads.
    #[serde(default)]
    pub motor_type: Option<MotorType>,
    /// Conductors per phase.
    pub parallel_conductors: u32,
    /// Nominal current (A).
    pub nominal_current_a: f64,
    /// Current after the load-type margin (A).
    pub adjusted_current_a: f64,
    /// Grouping derating factor applied.
    pub grouping_factor: f64,
    /// Current after grouping and temperature correction (A).
    pub corrected_current_a: f64,
    /// Motor starting current (A).
    #[serde(default)]
    pub starting_current_a: Option<f64>,
    /// Identifier of the selected conductor in the reference table.
    pub conductor_id: u32,
    /// Run length (m) when a voltage-drop pass ran.
    #[serde(default)]
    pub length_m: Option<f64>,
    /// Voltage drop (V) of the selected conductor.
    #[serde(default)]
    pub voltage_drop_v: Option<f64>,
    /// Voltage drop as a percentage of the nominal voltage.
    #[serde(default)]
    pub drop_percent: Option<f64>,
}

impl From<&CurrentResult> for CalculationRecord {
    fn from(result: &CurrentResult) -> Self {
        Self {
            voltage: result.voltage,
            power: result.power,
            power_factor: result.power_factor,
            phases: result.phases,
            is_motor: result.is_motor,
            motor_type: result.motor_type,
            parallel_conductors: result.parallel_conductors,
            nominal_current_a: result.nominal_current_a,
            adjusted_current_a: result.adjusted_current_a,
            grouping_factor: result.grouping_factor,
            corrected_current_a: result.corrected_current_a,
            starting_current_a: result.starting_current_a,
            conductor_id: result.suggested_conductor.id,
            length_m: None,
            voltage_drop_v: None,
            drop_percent: None,
        }
    }
}

impl From<&VoltageDropResult> for CalculationRecord {
    fn from(result: &VoltageDropResult) -> Self {
        let drop = &result.voltage_drop;
        Self {
            conductor_id: drop.conductor.id,
            length_m: Some(drop.length_m),
            voltage_drop_v: Some(drop.voltage_drop_v),
            drop_percent: Some(drop.drop_percent),
            ..Self::from(&result.current)
        }
    }
}

impl From<&SizingResult> for CalculationRecord {
    fn from(result: &SizingResult) -> Self {
        let base = Self {
            conductor_id: result.selected_conductor.id,
            ..Self::from(&result.current)
        };
        match &result.voltage_drop {
            Some(drop) => Self {
                length_m: Some(drop.length_m),
                voltage_drop_v: Some(drop.voltage_drop_v),
                drop_percent: Some(drop.drop_percent),
                ..base
            },
            None => base,
        }
    }
}

/// A stored record with its server-assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Sequential identifier assigned when appending.
    pub id: u64,
    /// Timestamp when the calculation was recorded.
    pub recorded_at: DateTime<Utc>,
    /// The calculation itself.
    #[serde(flatten)]
    pub record: CalculationRecord,
}

/// History entry joined with the descriptive fields of its conductor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryView {
    /// The stored entry.
    #[serde(flatten)]
    pub entry: HistoryEntry,
    /// Conductor gauge label, if the conductor is still in the reference table.
    pub gauge: Option<String>,
    /// Conductor material.
    pub material: Option<CableMaterial>,
    /// Conductor insulation type.
    pub insulation: Option<String>,
}

/// Attach conductor gauge, material and insulation to each entry.
pub fn join_conductors(entries: Vec<HistoryEntry>, reference: &ReferenceData) -> Vec<HistoryView> {
    entries
        .into_iter()
        .map(|entry| {
            let conductor = reference.conductor(entry.record.conductor_id);
            HistoryView {
                gauge: conductor.map(|c| c.gauge.clone()),
                material: conductor.map(|c| c.material),
                insulation: conductor.map(|c| c.insulation.clone()),
                entry,
            }
        })
        .collect()
}

/// Newest first: later timestamps, then higher identifiers.
pub(crate) fn newest_first(entries: &mut [HistoryEntry]) {
    entries.sort_by(|a, b| {
        b.recorded_at
            .cmp(&a.recorded_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn record(conductor_id: u32) -> CalculationRecord {
        CalculationRecord {
            voltage: 220.0,
            power: 10.0,
            power_factor: 0.9,
            phases: PhaseType::Three,
            is_motor: false,
            motor_type: None,
            parallel_conductors: 1,
            nominal_current_a: 29.16,
            adjusted_current_a: 32.08,
            grouping_factor: 1.0,
            corrected_current_a: 32.08,
            starting_current_a: None,
            conductor_id,
            length_m: None,
            voltage_drop_v: None,
            drop_percent: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_fills_conductor_descriptors() {
        let reference = ReferenceData::seeded();
        let entries = vec![
            HistoryEntry {
                id: 1,
                recorded_at: Utc::now(),
                record: fixtures::record(4),
            },
            HistoryEntry {
                id: 2,
                recorded_at: Utc::now(),
                record: fixtures::record(999),
            },
        ];
        let views = join_conductors(entries, &reference);
        assert_eq!(views[0].gauge.as_deref(), Some("8 AWG"));
        assert_eq!(views[0].material, Some(CableMaterial::Aluminum));
        assert_eq!(views[0].insulation.as_deref(), Some("XHHW"));
        assert!(views[1].gauge.is_none());
    }

    #[test]
    fn entry_serializes_flat() {
        let entry = HistoryEntry {
            id: 7,
            recorded_at: Utc::now(),
            record: fixtures::record(4),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["conductor_id"], 4);
        assert_eq!(json["phases"], "three");
    }
}
